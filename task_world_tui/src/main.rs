use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use task_world_core::{
    ObjectId, Position,
    config::{Config, load_scenario_from_string},
    controller::{StepController, StepReport},
    runner::{episode_utility, run_episode, run_experiment},
};

#[derive(Parser, Debug)]
#[command(version, about = "Grid agent that paints two targets and opens a door", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    config: Option<PathBuf>,

    /// Scenario map file, overriding the configured grid and layout
    #[arg(short, long, value_name = "MAP_FILE", global = true)]
    map: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one episode and print its summary
    Episode {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
    /// Run many episodes and print aggregate statistics
    Experiment {
        #[arg(short, long)]
        episodes: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Watch one episode in the terminal
    Watch {
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
        /// Milliseconds between steps
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,
    },
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Config::from_json_str(&json)?
        }
        None => Config::default(),
    };
    if let Some(path) = &args.map {
        let map = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read map file {}", path.display()))?;
        config.scenario = load_scenario_from_string(&map, &config.scenario)?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Episode { seed } => {
            let mut controller = StepController::new(config.scenario, seed)?;
            let experiment = &config.experiment;
            let summary =
                run_episode(&mut controller, seed, experiment.step_limit, &experiment.bonuses);
            println!("=== One Episode (seed {seed}) ===");
            println!("Steps: {}", summary.steps);
            println!("Goal reached: {}", summary.goal_reached);
            println!("Total reward: {:.4}", summary.total_reward);
            println!("Total utility: {:.4}", summary.utility);
        }
        Command::Experiment { episodes, seed } => {
            let mut config = config;
            if let Some(episodes) = episodes {
                config.experiment.episodes = episodes;
            }
            if seed.is_some() {
                config.experiment.seed = seed;
            }
            let report = run_experiment(&config)?;
            let count = report.episodes.len();
            println!("=== Experiment ({count} episodes, base seed {}) ===", report.base_seed);
            println!("Average utility: {:.4}", report.average_utility);
            println!("Min utility: {:.4}", report.min_utility);
            println!("Max utility: {:.4}", report.max_utility);
            println!("Goals reached: {}/{count}", report.successes);
            println!("Success rate: {:.2}%", report.success_rate * 100.0);
        }
        Command::Watch { seed, tick_ms } => {
            let mut app = App::new(config, seed)?;
            let mut terminal = setup_terminal()?;
            let outcome = run_app(&mut terminal, &mut app, Duration::from_millis(tick_ms));
            restore_terminal(&mut terminal)?;
            outcome?;
        }
    }
    Ok(())
}

struct App {
    controller: StepController,
    config: Config,
    last_report: Option<StepReport>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(config: Config, seed: u64) -> Result<Self> {
        Ok(App {
            controller: StepController::new(config.scenario.clone(), seed)?,
            config,
            last_report: None,
            should_quit: false,
        })
    }

    fn finished(&self) -> bool {
        self.controller.is_goal() || self.controller.steps() >= self.config.experiment.step_limit
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.finished() {
            return;
        }
        self.last_report = Some(self.controller.step());
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if let KeyCode::Char('q') | KeyCode::Esc = key.code {
                    app.quit();
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Map
            Constraint::Percentage(30), // Agent
            Constraint::Percentage(10), // Help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_status(frame, main_layout[1], app);

    let help = if app.finished() {
        "Episode over. Press 'q' or 'Esc' to quit."
    } else {
        "Press 'q' or 'Esc' to quit."
    };
    let help_text = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn object_style(id: ObjectId) -> Style {
    match id {
        ObjectId::Brush | ObjectId::Color => Style::default().fg(Color::Yellow),
        ObjectId::Key | ObjectId::Code => Style::default().fg(Color::Cyan),
        ObjectId::Table | ObjectId::Chair | ObjectId::Door => Style::default().fg(Color::Green),
    }
}

fn flag(done: bool) -> Span<'static> {
    if done {
        Span::styled("yes", Style::default().fg(Color::Green))
    } else {
        Span::styled("no", Style::default().fg(Color::Red))
    }
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.controller.state();
    let flags = state.flags();

    let mut carried = vec![Span::raw("Carrying: ")];
    carried.extend(
        state
            .inventory()
            .iter()
            .map(|item| Span::styled(format!("{item} "), object_style(item))),
    );

    let subgoal = app
        .controller
        .policy()
        .active_rule(state)
        .map_or("done", |(rule, _)| rule.name);
    let last_reward = app.last_report.as_ref().map_or(0.0, |report| report.reward);

    let lines = vec![
        Line::from(format!(
            "Step: {}  Position: {}  Subgoal: {}",
            app.controller.steps(),
            state.position(),
            subgoal
        )),
        Line::from(carried),
        Line::from(vec![
            Span::raw("Table painted: "),
            flag(flags.table_painted),
            Span::raw("  Chair painted: "),
            flag(flags.chair_painted),
            Span::raw("  Door open: "),
            flag(flags.door_open),
        ]),
        Line::from(format!(
            "Last reward: {:.2}  Total reward: {:.2}  Utility: {:.2}",
            last_reward,
            state.total_reward(),
            episode_utility(state, &app.config.experiment.bonuses)
        )),
    ];

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Agent"));
    frame.render_widget(status, area);
}

/// Draws the world with the highest row on top, matching environment coordinates.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.controller.state();
    let size = state.scenario().grid_size;

    let lines: Vec<Line> = (1..=size)
        .rev()
        .map(|y| {
            let spans: Vec<Span> = (1..=size)
                .map(|x| {
                    let cell = Position::new(x, y);
                    if state.position() == cell {
                        return Span::styled(" @ ", Style::default().fg(Color::Red).bold());
                    }
                    if state.obstacles().contains(&cell) {
                        return Span::styled("###", Style::default().fg(Color::DarkGray));
                    }
                    match state.placed_objects().find(|&(_, pos)| pos == cell) {
                        Some((id, _)) => {
                            let done = match id {
                                ObjectId::Door => state.door_open(),
                                other => state.is_painted(other),
                            };
                            let style = object_style(id);
                            let style = if done { style.bold().reversed() } else { style };
                            Span::styled(format!("{:^3}", id.code()), style)
                        }
                        None => Span::raw(" . "),
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Task World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
