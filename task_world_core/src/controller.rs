use serde::Serialize;

use crate::{
    Move, ObjectId, Position,
    config::{ScenarioConfig, ScenarioError},
    pathfinding::{AStar, PathFinder},
    planner::PathPlanner,
    policy::{Policy, SubgoalPolicy},
    world::WorldState,
};

/// What happened during one call to [`StepController::step`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub target: Position,
    /// The move taken, or `None` if the agent interacted in place, had no
    /// route, or the move was absorbed.
    pub moved: Option<Move>,
    pub position: Position,
    pub picked_up: Vec<ObjectId>,
    pub painted: Vec<ObjectId>,
    pub door_opened: bool,
    pub reward: f64,
}

/// Runs the agent one timestep at a time: choose a target, take at most one
/// step toward it, interact, then score the step.
#[derive(Debug, Clone)]
pub struct StepController<P = SubgoalPolicy, F = AStar> {
    state: WorldState,
    policy: P,
    planner: PathPlanner<F>,
    steps: usize,
}

impl StepController {
    pub fn new(scenario: ScenarioConfig, seed: u64) -> Result<Self, ScenarioError> {
        let planner = PathPlanner::new(scenario.grid_size);
        Ok(Self::with_parts(
            WorldState::new(scenario, seed)?,
            SubgoalPolicy::default(),
            planner,
        ))
    }
}

impl<P: Policy, F: PathFinder> StepController<P, F> {
    pub fn with_parts(state: WorldState, policy: P, planner: PathPlanner<F>) -> Self {
        Self {
            state,
            policy,
            planner,
            steps: 0,
        }
    }

    /// Starts a new episode with `seed`.
    pub fn reset(&mut self, seed: u64) {
        self.state.reset(seed);
        self.steps = 0;
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Steps taken since the last reset.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_goal(&self) -> bool {
        self.state.is_goal()
    }

    pub fn total_reward(&self) -> f64 {
        self.state.total_reward()
    }

    /// Advances the world by one timestep.
    ///
    /// Standing on the target means interacting without moving. Otherwise the
    /// first move of a fresh route is applied, and interactions are still
    /// attempted so arriving and interacting can share a step.
    pub fn step(&mut self) -> StepReport {
        let target = self.policy.choose_target(&self.state);
        let start = self.state.position();

        let mut moved = None;
        if start != target {
            if let Some(mv) = self.planner.next_move(start, target, self.state.obstacles()) {
                if self.state.apply_move(mv) {
                    moved = Some(mv);
                }
            }
        }

        let picked_up = self.state.pick_up();
        let painted = self.state.paint();
        let door_opened = self.state.open_door();
        let reward = self.state.record_step_reward();
        self.steps += 1;

        let report = StepReport {
            target,
            moved,
            position: self.state.position(),
            picked_up,
            painted,
            door_opened,
            reward,
        };
        log::trace!("Step {}: {report:?}", self.steps);
        report
    }
}
