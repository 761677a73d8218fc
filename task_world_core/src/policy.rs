use crate::{ObjectId, Position, world::WorldState};

/// Decides where the agent should head next.
pub trait Policy {
    /// The cell to approach, in environment coordinates. Returning the agent's
    /// own cell means "interact here".
    fn choose_target(&self, state: &WorldState) -> Position;
}

/// One entry of a [`SubgoalPolicy`]: when `applies` holds, head for `object`.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&WorldState) -> bool,
    pub object: ObjectId,
}

impl Rule {
    pub const fn new(name: &'static str, applies: fn(&WorldState) -> bool, object: ObjectId) -> Self {
        Self {
            name,
            applies,
            object,
        }
    }
}

/// A fixed, ordered list of rules. The first rule that applies wins; with none
/// applicable the agent stays where it is.
#[derive(Debug, Clone)]
pub struct SubgoalPolicy {
    rules: Vec<Rule>,
}

impl SubgoalPolicy {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Paint both targets first, then open the door. Supplies are fetched one
    /// at a time: brush before color, key before code.
    pub fn two_stage() -> Self {
        Self::new(vec![
            Rule::new(
                "fetch brush",
                |s| !s.painting_complete() && !s.holds(ObjectId::Brush),
                ObjectId::Brush,
            ),
            Rule::new(
                "fetch color",
                |s| !s.painting_complete() && !s.holds(ObjectId::Color),
                ObjectId::Color,
            ),
            Rule::new(
                "paint table",
                |s| !s.is_painted(ObjectId::Table),
                ObjectId::Table,
            ),
            Rule::new(
                "paint chair",
                |s| !s.is_painted(ObjectId::Chair),
                ObjectId::Chair,
            ),
            Rule::new(
                "fetch key",
                |s| !s.door_open() && !s.holds(ObjectId::Key),
                ObjectId::Key,
            ),
            Rule::new(
                "fetch code",
                |s| !s.door_open() && !s.holds(ObjectId::Code),
                ObjectId::Code,
            ),
            Rule::new("open door", |s| !s.door_open(), ObjectId::Door),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first applicable rule whose object is still on the grid, with
    /// that object's cell.
    pub fn active_rule(&self, state: &WorldState) -> Option<(&Rule, Position)> {
        self.rules
            .iter()
            .filter(|rule| (rule.applies)(state))
            .find_map(|rule| Some((rule, state.placement(rule.object).position()?)))
    }
}

impl Default for SubgoalPolicy {
    fn default() -> Self {
        Self::two_stage()
    }
}

impl Policy for SubgoalPolicy {
    fn choose_target(&self, state: &WorldState) -> Position {
        self.active_rule(state)
            .map_or(state.position(), |(_, target)| target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Move, config::ScenarioConfig};

    /// ```text
    /// y5  .. .. .. ## ..
    /// y4  .. .. .. ## ..
    /// y3  .. Ch K  Cd D
    /// y2  ## ## .. .. ..
    /// y1  ST B  Cl T  ..
    /// ```
    fn world() -> WorldState {
        let layout = [
            (ObjectId::Brush, (2, 1)),
            (ObjectId::Color, (3, 1)),
            (ObjectId::Table, (4, 1)),
            (ObjectId::Chair, (2, 3)),
            (ObjectId::Key, (3, 3)),
            (ObjectId::Code, (4, 3)),
            (ObjectId::Door, (5, 3)),
        ]
        .into_iter()
        .map(|(id, (x, y))| (id, Position::new(x, y)))
        .collect();
        let scenario = ScenarioConfig {
            layout: Some(layout),
            ..ScenarioConfig::default()
        };
        WorldState::new(scenario, 0).unwrap()
    }

    fn walk_to(state: &mut WorldState, moves: &[(isize, isize)]) {
        for &(dx, dy) in moves {
            assert!(state.apply_move(Move::new(dx, dy)));
        }
    }

    fn active(policy: &SubgoalPolicy, state: &WorldState) -> &'static str {
        policy.active_rule(state).map_or("none", |(rule, _)| rule.name)
    }

    #[test]
    fn tools_come_first_one_at_a_time() {
        let policy = SubgoalPolicy::default();
        let mut state = world();
        assert_eq!(policy.choose_target(&state), Position::new(2, 1));

        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        assert_eq!(active(&policy, &state), "fetch color");
        assert_eq!(policy.choose_target(&state), Position::new(3, 1));

        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        assert_eq!(active(&policy, &state), "paint table");
        assert_eq!(policy.choose_target(&state), Position::new(4, 1));
    }

    #[test]
    fn keys_held_early_do_not_skip_painting() {
        let policy = SubgoalPolicy::default();
        let mut state = world();
        // Brush, then up through (3,1)->(3,2)->(3,3) collecting color and key.
        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        walk_to(&mut state, &[(0, 1), (0, 1)]);
        state.pick_up();
        assert!(state.holds(ObjectId::Key));
        assert_eq!(active(&policy, &state), "paint table");
    }

    #[test]
    fn painting_table_then_chair_then_door_stage() {
        let policy = SubgoalPolicy::default();
        let mut state = world();
        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        walk_to(&mut state, &[(1, 0)]);
        state.paint();
        assert_eq!(active(&policy, &state), "paint chair");
        assert_eq!(policy.choose_target(&state), Position::new(2, 3));

        walk_to(&mut state, &[(-1, 0), (0, 1), (0, 1), (-1, 0)]);
        state.paint();
        assert!(state.painting_complete());
        assert_eq!(active(&policy, &state), "fetch key");

        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        assert_eq!(active(&policy, &state), "fetch code");
        walk_to(&mut state, &[(1, 0)]);
        state.pick_up();
        assert_eq!(active(&policy, &state), "open door");
        assert_eq!(policy.choose_target(&state), Position::new(5, 3));

        walk_to(&mut state, &[(1, 0)]);
        assert!(state.open_door());
        assert_eq!(active(&policy, &state), "none");
        assert_eq!(policy.choose_target(&state), state.position());
    }

    #[test]
    fn custom_rules_run_in_order() {
        let policy = SubgoalPolicy::new(vec![
            Rule::new("door first", |s| !s.door_open(), ObjectId::Door),
            Rule::new("then brush", |_| true, ObjectId::Brush),
        ]);
        let state = world();
        assert_eq!(policy.choose_target(&state), Position::new(5, 3));
        assert_eq!(policy.rules().len(), 2);
    }
}
