use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{ObjectId, Position, coords::CoordinateMapper};

/// Largest side length a scenario may declare.
pub const MAX_GRID_SIZE: usize = 1024;

/// Problems with a scenario that make it unplayable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Grid size must be at least 1")]
    EmptyGrid,
    #[error("Grid size {size} exceeds the maximum of {max}")]
    GridTooLarge { size: usize, max: usize },
    #[error("{what} at {position} is off the {size}x{size} world")]
    OffWorld {
        what: String,
        position: Position,
        size: usize,
    },
    #[error("Home cell {0} is an obstacle")]
    HomeBlocked(Position),
    #[error("Object {object} placed on obstacle {position}")]
    ObjectOnObstacle { object: ObjectId, position: Position },
    #[error("Object {object} placed on the home cell {position}")]
    ObjectOnHome { object: ObjectId, position: Position },
    #[error("Objects {first} and {second} share cell {position}")]
    SharedCell {
        first: ObjectId,
        second: ObjectId,
        position: Position,
    },
    #[error("Layout is missing objects {missing:?}")]
    IncompleteLayout { missing: Vec<ObjectId> },
    #[error("Only {free} free cells for {needed} objects")]
    NotEnoughFreeCells { free: usize, needed: usize },
}

/// Errors raised while loading configuration or scenario maps.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Map string is empty.")]
    EmptyMap,
    #[error("Map row {row} has {found} cells, expected {expected} (maps are square)")]
    NotSquare {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{token}' at row {row}, column {column}.")]
    UnknownToken {
        token: String,
        row: usize,
        column: usize,
    },
    #[error("Map code '{0}' appears more than once.")]
    Duplicate(String),
    #[error("No start position ('ST') found in map.")]
    MissingHome,
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Per-step reward weights. All are penalties, so they should be `<= 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RewardConfig {
    /// Charged when nothing is carried.
    pub idle: f64,
    /// Charged per carried item.
    pub per_item: f64,
    /// Charged again per carried item that no unfinished stage needs.
    pub per_incompatible: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        RewardConfig {
            idle: -0.01,
            per_item: -0.02,
            per_incompatible: -0.03,
        }
    }
}

/// The static description of a world: geometry, rules and optional fixed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScenarioConfig {
    pub grid_size: usize,
    pub home: Position,
    pub obstacles: BTreeSet<Position>,
    pub max_carry: usize,
    /// Remove a stage's supplies from the inventory once the stage is done.
    pub spend_supplies: bool,
    pub rewards: RewardConfig,
    /// Fixed object placement. `None` shuffles objects on every reset.
    pub layout: Option<BTreeMap<ObjectId, Position>>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        ScenarioConfig {
            grid_size: 5,
            home: Position::new(1, 1),
            obstacles: [(1, 2), (2, 2), (4, 4), (4, 5)]
                .into_iter()
                .map(|(x, y)| Position::new(x, y))
                .collect(),
            max_carry: 3,
            spend_supplies: true,
            rewards: RewardConfig::default(),
            layout: None,
        }
    }
}

impl ScenarioConfig {
    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(self.grid_size)
    }

    /// Cells that may hold an object: on the world, not an obstacle, not home.
    ///
    /// Ordered column by column (x outer, y inner).
    pub fn free_cells(&self) -> Vec<Position> {
        (1..=self.grid_size)
            .flat_map(|x| (1..=self.grid_size).map(move |y| Position::new(x, y)))
            .filter(|cell| !self.obstacles.contains(cell) && *cell != self.home)
            .collect()
    }

    /// Checks the invariants every reset relies on.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.grid_size == 0 {
            return Err(ScenarioError::EmptyGrid);
        }
        if self.grid_size > MAX_GRID_SIZE {
            return Err(ScenarioError::GridTooLarge {
                size: self.grid_size,
                max: MAX_GRID_SIZE,
            });
        }
        let mapper = self.mapper();
        let off_world = |what: String, position: Position| ScenarioError::OffWorld {
            what,
            position,
            size: self.grid_size,
        };

        if !mapper.on_world(self.home) {
            return Err(off_world("Home".to_string(), self.home));
        }
        if let Some(&obstacle) = self.obstacles.iter().find(|&&o| !mapper.on_world(o)) {
            return Err(off_world("Obstacle".to_string(), obstacle));
        }
        if self.obstacles.contains(&self.home) {
            return Err(ScenarioError::HomeBlocked(self.home));
        }

        match &self.layout {
            Some(layout) => {
                let missing: Vec<_> = ObjectId::ALL
                    .into_iter()
                    .filter(|id| !layout.contains_key(id))
                    .collect();
                if !missing.is_empty() {
                    return Err(ScenarioError::IncompleteLayout { missing });
                }
                let mut occupied: BTreeMap<Position, ObjectId> = BTreeMap::new();
                for (&object, &position) in layout {
                    if !mapper.on_world(position) {
                        return Err(off_world(format!("Object {object}"), position));
                    }
                    if self.obstacles.contains(&position) {
                        return Err(ScenarioError::ObjectOnObstacle { object, position });
                    }
                    if position == self.home {
                        return Err(ScenarioError::ObjectOnHome { object, position });
                    }
                    if let Some(first) = occupied.insert(position, object) {
                        return Err(ScenarioError::SharedCell {
                            first,
                            second: object,
                            position,
                        });
                    }
                }
            }
            None => {
                let free = self.free_cells().len();
                if free < ObjectId::ALL.len() {
                    return Err(ScenarioError::NotEnoughFreeCells {
                        free,
                        needed: ObjectId::ALL.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Terminal bonuses added to the accumulated reward when scoring an episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TerminalBonuses {
    /// Per painted target.
    pub painted: f64,
    pub door_open: f64,
}

impl Default for TerminalBonuses {
    fn default() -> Self {
        TerminalBonuses {
            painted: 1.0,
            door_open: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExperimentConfig {
    pub step_limit: usize,
    pub episodes: usize,
    /// Episode `i` is reset with `seed + i`. Drawn at random when unset.
    pub seed: Option<u64>,
    pub bonuses: TerminalBonuses,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        ExperimentConfig {
            step_limit: 500,
            episodes: 100,
            seed: None,
            bonuses: TerminalBonuses::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub scenario: ScenarioConfig,
    pub experiment: ExperimentConfig,
}

impl Config {
    /// Parses and validates a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.scenario.validate()?;
        Ok(config)
    }
}

/// Loads a scenario from a text map.
///
/// One line per row, top row first, cells separated by whitespace:
/// `..` floor, `##` obstacle, `ST` home, or an object code (`B`, `Cl`, `K`,
/// `Cd`, `T`, `Ch`, `D`). A map places either all seven objects (fixed layout)
/// or none of them (random placement). Rules and rewards come from `base`.
pub fn load_scenario_from_string(
    map_string: &str,
    base: &ScenarioConfig,
) -> Result<ScenarioConfig, ConfigError> {
    let rows: Vec<Vec<&str>> = map_string
        .trim()
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    if rows.is_empty() || rows[0].is_empty() {
        return Err(ConfigError::EmptyMap);
    }

    let size = rows.len();
    let mut home = None;
    let mut obstacles = BTreeSet::new();
    let mut layout = BTreeMap::new();

    for (row, tokens) in rows.iter().enumerate() {
        if tokens.len() != size {
            return Err(ConfigError::NotSquare {
                row,
                expected: size,
                found: tokens.len(),
            });
        }
        for (column, &token) in tokens.iter().enumerate() {
            let position = Position::new(column + 1, size - row);
            match token {
                ".." => {}
                "##" => {
                    obstacles.insert(position);
                }
                "ST" => {
                    if home.replace(position).is_some() {
                        return Err(ConfigError::Duplicate(token.to_string()));
                    }
                }
                code => {
                    let object =
                        code.parse::<ObjectId>()
                            .map_err(|_| ConfigError::UnknownToken {
                                token: code.to_string(),
                                row,
                                column,
                            })?;
                    if layout.insert(object, position).is_some() {
                        return Err(ConfigError::Duplicate(token.to_string()));
                    }
                }
            }
        }
    }

    let scenario = ScenarioConfig {
        grid_size: size,
        home: home.ok_or(ConfigError::MissingHome)?,
        obstacles,
        layout: (!layout.is_empty()).then_some(layout),
        ..base.clone()
    };
    scenario.validate()?;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXED_MAP: &str = "
        .. Ch .. ## Cd
        .. .. .. ## ..
        .. T  .. .. K
        ## ## D  .. ..
        ST B  Cl .. ..
    ";

    #[test]
    fn default_scenario_is_valid() {
        let scenario = ScenarioConfig::default();
        assert!(scenario.validate().is_ok());
        // 25 cells minus 4 obstacles minus home.
        assert_eq!(scenario.free_cells().len(), 20);
    }

    #[test]
    fn empty_json_uses_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.experiment.step_limit, 500);
    }

    #[test]
    fn json_overrides_individual_fields() {
        let config = Config::from_json_str(
            r#"{
                "scenario": { "max-carry": 4, "spend-supplies": false },
                "experiment": { "seed": 42, "bonuses": { "door-open": 2.0 } }
            }"#,
        )
        .unwrap();
        assert_eq!(config.scenario.max_carry, 4);
        assert!(!config.scenario.spend_supplies);
        assert_eq!(config.scenario.grid_size, 5);
        assert_eq!(config.experiment.seed, Some(42));
        assert_eq!(config.experiment.bonuses.door_open, 2.0);
        assert_eq!(config.experiment.bonuses.painted, 1.0);
    }

    #[test]
    fn json_layout_uses_object_codes() {
        let config = Config::from_json_str(
            r#"{ "scenario": { "layout": {
                "B": {"x": 2, "y": 1}, "Cl": {"x": 3, "y": 1}, "K": {"x": 5, "y": 1},
                "Cd": {"x": 5, "y": 2}, "T": {"x": 3, "y": 3}, "Ch": {"x": 1, "y": 4},
                "D": {"x": 5, "y": 3}
            } } }"#,
        )
        .unwrap();
        let layout = config.scenario.layout.unwrap();
        assert_eq!(layout[&ObjectId::Chair], Position::new(1, 4));
    }

    #[test]
    fn invalid_scenarios_are_rejected() {
        let blocked_home = r#"{ "scenario": { "home": {"x": 1, "y": 2} } }"#;
        assert!(matches!(
            Config::from_json_str(blocked_home),
            Err(ConfigError::Scenario(ScenarioError::HomeBlocked(_)))
        ));

        let partial = r#"{ "scenario": { "layout": { "B": {"x": 2, "y": 1} } } }"#;
        assert!(matches!(
            Config::from_json_str(partial),
            Err(ConfigError::Scenario(ScenarioError::IncompleteLayout { .. }))
        ));

        assert!(matches!(
            Config::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn crowded_grid_has_too_few_free_cells() {
        let scenario = ScenarioConfig {
            grid_size: 2,
            obstacles: BTreeSet::new(),
            ..ScenarioConfig::default()
        };
        assert_eq!(
            scenario.validate(),
            Err(ScenarioError::NotEnoughFreeCells { free: 3, needed: 7 })
        );
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let huge = r#"{ "scenario": {
            "grid-size": 4294967296,
            "obstacles": [],
            "layout": {
                "B": {"x": 2, "y": 1}, "Cl": {"x": 3, "y": 1}, "K": {"x": 5, "y": 1},
                "Cd": {"x": 5, "y": 2}, "T": {"x": 3, "y": 3}, "Ch": {"x": 1, "y": 4},
                "D": {"x": 5, "y": 3}
            }
        } }"#;
        assert!(matches!(
            Config::from_json_str(huge),
            Err(ConfigError::Scenario(ScenarioError::GridTooLarge {
                size: 4294967296,
                max: MAX_GRID_SIZE
            }))
        ));

        // Random placement would otherwise walk every cell while validating.
        let unbounded = ScenarioConfig {
            grid_size: usize::MAX,
            ..ScenarioConfig::default()
        };
        assert_eq!(
            unbounded.validate(),
            Err(ScenarioError::GridTooLarge {
                size: usize::MAX,
                max: MAX_GRID_SIZE
            })
        );

        let largest = ScenarioConfig {
            grid_size: MAX_GRID_SIZE,
            ..ScenarioConfig::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn map_rows_run_top_down() {
        let scenario = load_scenario_from_string(FIXED_MAP, &ScenarioConfig::default()).unwrap();
        assert_eq!(scenario, ScenarioConfig {
            layout: scenario.layout.clone(),
            ..ScenarioConfig::default()
        });
        let layout = scenario.layout.unwrap();
        assert_eq!(layout[&ObjectId::Brush], Position::new(2, 1));
        assert_eq!(layout[&ObjectId::Code], Position::new(5, 5));
        assert_eq!(layout[&ObjectId::Chair], Position::new(2, 5));
        assert_eq!(layout[&ObjectId::Door], Position::new(3, 2));
    }

    #[test]
    fn map_without_objects_shuffles() {
        let map = "
            .. .. .. ## ..
            .. .. .. ## ..
            .. .. .. .. ..
            ## ## .. .. ..
            ST .. .. .. ..
        ";
        let scenario = load_scenario_from_string(map, &ScenarioConfig::default()).unwrap();
        assert_eq!(scenario.layout, None);
        assert_eq!(scenario.obstacles, ScenarioConfig::default().obstacles);
    }

    #[test]
    fn malformed_maps_are_rejected() {
        let base = ScenarioConfig::default();
        assert!(matches!(
            load_scenario_from_string("", &base),
            Err(ConfigError::EmptyMap)
        ));
        assert!(matches!(
            load_scenario_from_string("ST ..\n.. .. ..", &base),
            Err(ConfigError::NotSquare { row: 1, .. })
        ));
        assert!(matches!(
            load_scenario_from_string("ST XX\n.. ..", &base),
            Err(ConfigError::UnknownToken { row: 0, column: 1, .. })
        ));
        assert!(matches!(
            load_scenario_from_string(".. ..\n.. ..", &base),
            Err(ConfigError::MissingHome)
        ));
        assert!(matches!(
            load_scenario_from_string(&FIXED_MAP.replace("Cd", "B "), &base),
            Err(ConfigError::Duplicate(_))
        ));
    }
}
