use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

use crate::{GridCell, map::Grid};

/// Shortest-path search over a walkability grid.
///
/// Implementations must be optimal for uniform step cost, move only in the
/// four cardinal directions and be deterministic.
pub trait PathFinder {
    /// Returns the cells from `start` to `goal` inclusive, or `None` if the
    /// goal cannot be reached. `grid[cell] == true` means walkable.
    fn find_path(&self, grid: &Grid<bool>, start: GridCell, goal: GridCell)
    -> Option<Vec<GridCell>>;
}

/// A* with a Manhattan heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

#[derive(Clone, Eq, PartialEq)]
struct PrioritizedCell {
    priority: usize,
    cell: GridCell,
}

impl Ord for PrioritizedCell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behaviour; ties resolved by cell so runs repeat exactly.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for PrioritizedCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PathFinder for AStar {
    fn find_path(
        &self,
        grid: &Grid<bool>,
        start: GridCell,
        goal: GridCell,
    ) -> Option<Vec<GridCell>> {
        let walkable = |cell: GridCell| grid.get(cell).copied().unwrap_or(false);
        if !walkable(start) || !walkable(goal) {
            return None;
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
        let mut cost_so_far: HashMap<GridCell, usize> = HashMap::new();

        frontier.push(PrioritizedCell {
            priority: start.manhattan(&goal),
            cell: start,
        });
        cost_so_far.insert(start, 0);

        let mut goal_reached = false;
        while let Some(PrioritizedCell { cell: current, .. }) = frontier.pop() {
            if current == goal {
                goal_reached = true;
                break;
            }

            let current_cost = cost_so_far[&current];
            for neighbour in grid.neighbours(current).filter(|&n| walkable(n)) {
                let new_cost = current_cost + 1;
                if cost_so_far
                    .get(&neighbour)
                    .is_none_or(|&known| new_cost < known)
                {
                    cost_so_far.insert(neighbour, new_cost);
                    came_from.insert(neighbour, current);
                    frontier.push(PrioritizedCell {
                        priority: new_cost + neighbour.manhattan(&goal),
                        cell: neighbour,
                    });
                }
            }
        }

        if !goal_reached {
            return None;
        }

        let mut path = vec![goal];
        let mut current = goal;
        while current != start {
            current = *came_from.get(&current)?;
            path.push(current);
        }
        path.reverse();
        Some(path)
    }
}
