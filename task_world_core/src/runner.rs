//! Episode and experiment loops built on [`StepController`].

use rand::Rng;
use serde::Serialize;

use crate::{
    ObjectId,
    config::{Config, ScenarioError, TerminalBonuses},
    controller::StepController,
    pathfinding::PathFinder,
    policy::Policy,
    world::WorldState,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub seed: u64,
    pub steps: usize,
    pub goal_reached: bool,
    pub total_reward: f64,
    /// `total_reward` plus terminal bonuses.
    pub utility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub base_seed: u64,
    pub episodes: Vec<EpisodeSummary>,
    pub average_utility: f64,
    pub min_utility: f64,
    pub max_utility: f64,
    pub successes: usize,
    pub success_rate: f64,
}

impl ExperimentReport {
    fn from_episodes(base_seed: u64, episodes: Vec<EpisodeSummary>) -> Self {
        let count = episodes.len();
        let utilities = episodes.iter().map(|e| e.utility);
        let (min_utility, max_utility) = utilities
            .clone()
            .fold(None, |acc: Option<(f64, f64)>, u| {
                Some(acc.map_or((u, u), |(lo, hi)| (lo.min(u), hi.max(u))))
            })
            .unwrap_or((0.0, 0.0));
        let successes = episodes.iter().filter(|e| e.goal_reached).count();
        let ratio = |value: f64| if count == 0 { 0.0 } else { value / count as f64 };

        ExperimentReport {
            base_seed,
            average_utility: ratio(utilities.sum()),
            min_utility,
            max_utility,
            successes,
            success_rate: ratio(successes as f64),
            episodes,
        }
    }
}

/// The accumulated reward plus a bonus per painted target and for an open door.
pub fn episode_utility(state: &WorldState, bonuses: &TerminalBonuses) -> f64 {
    let painted = [ObjectId::Table, ObjectId::Chair]
        .into_iter()
        .filter(|&target| state.is_painted(target))
        .count();
    let door = if state.door_open() { bonuses.door_open } else { 0.0 };
    state.total_reward() + bonuses.painted * painted as f64 + door
}

/// Steps the controller until the goal is reached or `step_limit` steps have
/// been taken in this episode. The controller is not reset first.
pub fn run_episode<P: Policy, F: PathFinder>(
    controller: &mut StepController<P, F>,
    seed: u64,
    step_limit: usize,
    bonuses: &TerminalBonuses,
) -> EpisodeSummary {
    while !controller.is_goal() && controller.steps() < step_limit {
        controller.step();
    }
    let summary = EpisodeSummary {
        seed,
        steps: controller.steps(),
        goal_reached: controller.is_goal(),
        total_reward: controller.total_reward(),
        utility: episode_utility(controller.state(), bonuses),
    };
    log::debug!("Episode finished: {summary:?}");
    summary
}

/// Runs `config.experiment.episodes` episodes, episode `i` seeded `base + i`.
pub fn run_experiment(config: &Config) -> Result<ExperimentReport, ScenarioError> {
    let experiment = &config.experiment;
    let base_seed = experiment
        .seed
        .unwrap_or_else(|| rand::rng().random::<u64>());
    let mut controller = StepController::new(config.scenario.clone(), base_seed)?;

    let episodes = (0..experiment.episodes as u64)
        .map(|episode| {
            let seed = base_seed.wrapping_add(episode);
            controller.reset(seed);
            run_episode(&mut controller, seed, experiment.step_limit, &experiment.bonuses)
        })
        .collect();

    let report = ExperimentReport::from_episodes(base_seed, episodes);
    log::info!(
        "{} episodes from seed {}: {}/{} goals, average utility {:.4}",
        report.episodes.len(),
        base_seed,
        report.successes,
        report.episodes.len(),
        report.average_utility
    );
    Ok(report)
}
