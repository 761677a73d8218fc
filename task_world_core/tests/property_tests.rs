use std::collections::BTreeSet;

use proptest::prelude::*;
use task_world_core::{
    ObjectId, Position,
    config::ScenarioConfig,
    controller::StepController,
    coords::CoordinateMapper,
    planner::PathPlanner,
    world::Placement,
};

fn cell(size: usize) -> impl Strategy<Value = Position> {
    (1..=size, 1..=size).prop_map(|(x, y)| Position::new(x, y))
}

proptest! {
    #[test]
    fn mapping_is_a_bijection(size in 1usize..12, seed_x in 0usize..12, seed_y in 0usize..12) {
        let mapper = CoordinateMapper::new(size);
        let position = Position::new(seed_x % size + 1, seed_y % size + 1);
        let planner_cell = mapper.to_planner(position).unwrap();
        prop_assert!(planner_cell.x < size && planner_cell.y < size);
        prop_assert_eq!(mapper.to_environment(planner_cell).unwrap(), position);
    }

    #[test]
    fn routes_are_unit_steps_around_obstacles(
        obstacles in prop::collection::btree_set(cell(5), 0..10),
        start in cell(5),
        goal in cell(5),
    ) {
        prop_assume!(!obstacles.contains(&start) && !obstacles.contains(&goal));
        let planner = PathPlanner::new(5);
        let moves = planner.route(start, goal, &obstacles);

        if start == goal {
            prop_assert!(moves.is_empty());
        }
        let mut position = start;
        for mv in &moves {
            prop_assert!(mv.is_unit());
            position = position.offset(*mv).unwrap();
            prop_assert!(planner.mapper().on_world(position));
            prop_assert!(!obstacles.contains(&position));
        }
        if !moves.is_empty() {
            prop_assert_eq!(position, goal);
            // Shortest on a grid can never beat Manhattan distance.
            prop_assert!(moves.len() >= start.x.abs_diff(goal.x) + start.y.abs_diff(goal.y));
        }
    }

    #[test]
    fn open_grid_routes_are_manhattan_optimal(start in cell(5), goal in cell(5)) {
        let planner = PathPlanner::new(5);
        let moves = planner.route(start, goal, &BTreeSet::new());
        prop_assert_eq!(moves.len(), start.x.abs_diff(goal.x) + start.y.abs_diff(goal.y));
    }

    #[test]
    fn episodes_respect_world_invariants(seed in any::<u64>(), spend in any::<bool>()) {
        let scenario = ScenarioConfig { spend_supplies: spend, ..ScenarioConfig::default() };
        let mut controller = StepController::new(scenario, seed).unwrap();
        let mut flags = controller.state().flags();
        let mut total = 0.0;

        for _ in 0..120 {
            let report = controller.step();
            let state = controller.state();
            total += report.reward;

            prop_assert!(report.reward < 0.0);
            prop_assert!(state.inventory().len() <= 3);
            prop_assert!(!state.obstacles().contains(&state.position()));
            for item in state.inventory().iter() {
                prop_assert_eq!(state.placement(item), Placement::Absent);
            }

            let now = state.flags();
            prop_assert!(now.table_painted >= flags.table_painted);
            prop_assert!(now.chair_painted >= flags.chair_painted);
            prop_assert!(now.door_open >= flags.door_open);
            if now.table_painted || now.chair_painted {
                prop_assert_eq!(state.placement(ObjectId::Brush), Placement::Absent);
                prop_assert_eq!(state.placement(ObjectId::Color), Placement::Absent);
            }
            flags = now;
        }
        prop_assert!((controller.total_reward() - total).abs() < 1e-9);
    }
}
