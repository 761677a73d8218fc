use std::collections::BTreeSet;

use crate::{
    Move, Position,
    coords::CoordinateMapper,
    pathfinding::{AStar, PathFinder},
};

/// Turns a subgoal cell into unit moves, planning in planner space and
/// answering in environment space.
#[derive(Debug, Clone)]
pub struct PathPlanner<F = AStar> {
    mapper: CoordinateMapper,
    finder: F,
}

impl PathPlanner<AStar> {
    pub fn new(size: usize) -> Self {
        Self::with_finder(size, AStar)
    }
}

impl<F: PathFinder> PathPlanner<F> {
    pub fn with_finder(size: usize, finder: F) -> Self {
        Self {
            mapper: CoordinateMapper::new(size),
            finder,
        }
    }

    pub fn mapper(&self) -> &CoordinateMapper {
        &self.mapper
    }

    /// Returns the moves leading from `start` to `goal`, both in environment
    /// coordinates.
    ///
    /// The route is empty when `start == goal` or when no path exists; callers
    /// treat that as "no move available" rather than as a failure.
    pub fn route(
        &self,
        start: Position,
        goal: Position,
        obstacles: &BTreeSet<Position>,
    ) -> Vec<Move> {
        if start == goal {
            return Vec::new();
        }

        let planned = self
            .mapper
            .build_walkability_grid(obstacles)
            .and_then(|grid| {
                let from = self.mapper.to_planner(start)?;
                let to = self.mapper.to_planner(goal)?;
                Ok(self.finder.find_path(&grid, from, to))
            });
        let cells = match planned {
            Ok(Some(cells)) => cells,
            Ok(None) => {
                log::debug!("No path from {start} to {goal}");
                return Vec::new();
            }
            Err(err) => {
                log::warn!("Cannot plan from {start} to {goal}: {err}");
                return Vec::new();
            }
        };

        let positions: Result<Vec<Position>, _> = cells
            .into_iter()
            .map(|cell| self.mapper.to_environment(cell))
            .collect();
        let positions = match positions {
            Ok(positions) => positions,
            Err(err) => {
                log::warn!("Path finder left the grid: {err}");
                return Vec::new();
            }
        };

        let mut moves = Vec::with_capacity(positions.len().saturating_sub(1));
        for pair in positions.windows(2) {
            let step = Move::between(pair[0], pair[1]);
            if !step.is_unit() {
                log::warn!("Invalid step from {} to {}, truncating route", pair[0], pair[1]);
                break;
            }
            moves.push(step);
        }
        moves
    }

    /// The first move of [`route`](Self::route), if any.
    pub fn next_move(
        &self,
        start: Position,
        goal: Position,
        obstacles: &BTreeSet<Position>,
    ) -> Option<Move> {
        self.route(start, goal, obstacles).into_iter().next()
    }
}
