use std::collections::{BTreeMap, BTreeSet};

use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Move, ObjectId, Position,
    config::{ScenarioConfig, ScenarioError},
    inventory::Inventory,
};

/// Where an object currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Lying at (or, for fixed interactables, standing on) a cell.
    At(Position),
    /// Picked up. Portable objects never return to the ground.
    Absent,
}

impl Placement {
    pub fn position(self) -> Option<Position> {
        match self {
            Placement::At(position) => Some(position),
            Placement::Absent => None,
        }
    }
}

/// Task progress. Every flag only ever goes from `false` to `true`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFlags {
    pub table_painted: bool,
    pub chair_painted: bool,
    pub door_open: bool,
}

impl TaskFlags {
    pub fn painting_complete(&self) -> bool {
        self.table_painted && self.chair_painted
    }

    pub fn all_done(&self) -> bool {
        self.painting_complete() && self.door_open
    }
}

/// Holds the state of the agent within the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub inventory: Inventory,
}

/// The world an agent acts in: positions, inventory, task flags and reward.
///
/// Every mutation checks its own precondition and does nothing when it does
/// not hold. None of them fail.
#[derive(Debug, Clone)]
pub struct WorldState {
    scenario: ScenarioConfig,
    agent: AgentState,
    objects: BTreeMap<ObjectId, Placement>,
    flags: TaskFlags,
    total_reward: f64,
}

impl WorldState {
    /// Validates the scenario and performs a first reset with `seed`.
    pub fn new(scenario: ScenarioConfig, seed: u64) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let mut state = WorldState {
            agent: AgentState {
                position: scenario.home,
                inventory: Inventory::new(scenario.max_carry),
            },
            objects: BTreeMap::new(),
            flags: TaskFlags::default(),
            total_reward: 0.0,
            scenario,
        };
        state.reset(seed);
        Ok(state)
    }

    /// Starts a fresh episode: agent home, nothing carried, flags cleared,
    /// reward zeroed and objects placed.
    ///
    /// Without a fixed layout, objects are dealt from a `seed`-shuffled list
    /// of free cells, so no two share a cell.
    pub fn reset(&mut self, seed: u64) {
        self.agent.position = self.scenario.home;
        self.agent.inventory.clear();
        self.flags = TaskFlags::default();
        self.total_reward = 0.0;

        self.objects = match &self.scenario.layout {
            Some(layout) => layout
                .iter()
                .map(|(&id, &position)| (id, Placement::At(position)))
                .collect(),
            None => {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut free_cells = self.scenario.free_cells();
                free_cells.shuffle(&mut rng);
                ObjectId::ALL
                    .into_iter()
                    .zip(free_cells.into_iter().rev())
                    .map(|(id, position)| (id, Placement::At(position)))
                    .collect()
            }
        };
        log::debug!("Reset with seed {seed}: {:?}", self.objects);
    }

    pub fn scenario(&self) -> &ScenarioConfig {
        &self.scenario
    }

    pub fn position(&self) -> Position {
        self.agent.position
    }

    pub fn agent(&self) -> &AgentState {
        &self.agent
    }

    pub fn inventory(&self) -> &Inventory {
        &self.agent.inventory
    }

    pub fn holds(&self, item: ObjectId) -> bool {
        self.agent.inventory.contains(item)
    }

    pub fn obstacles(&self) -> &BTreeSet<Position> {
        &self.scenario.obstacles
    }

    pub fn flags(&self) -> TaskFlags {
        self.flags
    }

    pub fn placement(&self, id: ObjectId) -> Placement {
        self.objects.get(&id).copied().unwrap_or(Placement::Absent)
    }

    /// Objects still on the grid, in [`ObjectId::ALL`] order.
    pub fn placed_objects(&self) -> impl Iterator<Item = (ObjectId, Position)> + '_ {
        self.objects
            .iter()
            .filter_map(|(&id, placement)| Some((id, placement.position()?)))
    }

    pub fn is_painted(&self, target: ObjectId) -> bool {
        match target {
            ObjectId::Table => self.flags.table_painted,
            ObjectId::Chair => self.flags.chair_painted,
            _ => false,
        }
    }

    pub fn painting_complete(&self) -> bool {
        self.flags.painting_complete()
    }

    pub fn door_open(&self) -> bool {
        self.flags.door_open
    }

    /// Both targets painted and the door open.
    pub fn is_goal(&self) -> bool {
        self.flags.all_done()
    }

    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    fn is_at(&self, id: ObjectId) -> bool {
        self.placement(id) == Placement::At(self.agent.position)
    }

    /// Moves the agent unless the destination is off the world or an
    /// obstacle. Returns whether the agent moved.
    pub fn apply_move(&mut self, mv: Move) -> bool {
        let destination = self
            .agent
            .position
            .offset(mv)
            .filter(|&next| self.scenario.mapper().on_world(next))
            .filter(|next| !self.scenario.obstacles.contains(next));
        match destination {
            Some(next) => {
                self.agent.position = next;
                true
            }
            None => {
                log::trace!("Move {mv:?} from {} absorbed", self.agent.position);
                false
            }
        }
    }

    /// Picks up every portable object on the agent's cell while there is room.
    /// Returns what was picked up.
    pub fn pick_up(&mut self) -> Vec<ObjectId> {
        let here = self.agent.position;
        let mut picked = Vec::new();
        for (&id, placement) in self.objects.iter_mut() {
            if !id.is_portable() || *placement != Placement::At(here) {
                continue;
            }
            if self.agent.inventory.try_add(id) {
                *placement = Placement::Absent;
                picked.push(id);
                log::debug!("Picked up {id} at {here}");
            } else {
                log::trace!("No room for {id} at {here}");
            }
        }
        picked
    }

    /// Paints a target on the agent's cell if brush and color are both held.
    /// Returns the targets painted by this call.
    pub fn paint(&mut self) -> Vec<ObjectId> {
        if !self.agent.inventory.contains_all(&ObjectId::PAINT_SUPPLIES) {
            return Vec::new();
        }
        let mut painted = Vec::new();
        for target in [ObjectId::Table, ObjectId::Chair] {
            if !self.is_at(target) || self.is_painted(target) {
                continue;
            }
            match target {
                ObjectId::Table => self.flags.table_painted = true,
                _ => self.flags.chair_painted = true,
            }
            log::debug!("Painted {target} at {}", self.agent.position);
            painted.push(target);
        }
        if !painted.is_empty() && self.painting_complete() {
            self.spend(&ObjectId::PAINT_SUPPLIES);
        }
        painted
    }

    /// Opens the door if the agent stands on it holding key and code.
    /// Returns whether this call opened it.
    pub fn open_door(&mut self) -> bool {
        if self.flags.door_open
            || !self.is_at(ObjectId::Door)
            || !self.agent.inventory.contains_all(&ObjectId::DOOR_SUPPLIES)
        {
            return false;
        }
        self.flags.door_open = true;
        log::debug!("Opened door at {}", self.agent.position);
        self.spend(&ObjectId::DOOR_SUPPLIES);
        true
    }

    fn spend(&mut self, supplies: &[ObjectId]) {
        if self.scenario.spend_supplies {
            self.agent.inventory.spend(supplies);
            log::debug!("Spent {supplies:?}");
        }
    }

    /// Supplies still required by an unfinished stage.
    pub fn needed_items(&self) -> BTreeSet<ObjectId> {
        let mut needed = BTreeSet::new();
        if !self.painting_complete() {
            needed.extend(ObjectId::PAINT_SUPPLIES);
        }
        if !self.flags.door_open {
            needed.extend(ObjectId::DOOR_SUPPLIES);
        }
        needed
    }

    /// The reward for the current state, without recording it.
    ///
    /// Idle agents pay `idle`; otherwise every carried item costs `per_item`
    /// and every item no unfinished stage needs costs `per_incompatible` on top.
    pub fn step_reward(&self) -> f64 {
        let weights = &self.scenario.rewards;
        let inventory = &self.agent.inventory;
        let needed = self.needed_items();
        let incompatible = inventory.iter().filter(|item| !needed.contains(item)).count();

        let carrying = if inventory.is_empty() {
            weights.idle
        } else {
            weights.per_item * inventory.len() as f64
        };
        carrying + weights.per_incompatible * incompatible as f64
    }

    /// Adds [`step_reward`](Self::step_reward) to the total and returns it.
    pub fn record_step_reward(&mut self) -> f64 {
        let reward = self.step_reward();
        self.total_reward += reward;
        reward
    }
}
