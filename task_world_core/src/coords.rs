//! Translation between environment and planner coordinates.
//!
//! Environment cells are 1-indexed with the origin bottom-left; planner cells
//! are 0-indexed with the origin top-left. For a square world of side `n`:
//!
//! ```text
//! planner_x = env_x - 1        env_x = planner_x + 1
//! planner_y = n - env_y        env_y = n - planner_y
//! ```

use std::collections::BTreeSet;

use crate::{
    GridCell, Position,
    map::{Grid, GridError},
};

/// Converts cells between the two conventions of a square world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    size: usize,
}

impl CoordinateMapper {
    pub const fn new(size: usize) -> Self {
        Self { size }
    }

    /// Side length of the world.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Checks that a position lies on the world.
    #[inline]
    pub fn on_world(&self, position: Position) -> bool {
        (1..=self.size).contains(&position.x) && (1..=self.size).contains(&position.y)
    }

    pub fn to_planner(&self, position: Position) -> Result<GridCell, GridError> {
        if !self.on_world(position) {
            return Err(GridError::OffWorld {
                position,
                size: self.size,
            });
        }
        Ok(GridCell::new(position.x - 1, self.size - position.y))
    }

    pub fn to_environment(&self, cell: GridCell) -> Result<Position, GridError> {
        if cell.x >= self.size || cell.y >= self.size {
            return Err(GridError::OutOfBounds {
                x: cell.x,
                y: cell.y,
                width: self.size,
                height: self.size,
            });
        }
        Ok(Position::new(cell.x + 1, self.size - cell.y))
    }

    /// Renders obstacles into a planner-space walkability grid (`true` = walkable).
    pub fn build_walkability_grid(
        &self,
        obstacles: &BTreeSet<Position>,
    ) -> Result<Grid<bool>, GridError> {
        let mut grid = Grid::from_generator(self.size, self.size, |_, _| true)?;
        for &obstacle in obstacles {
            grid.set(self.to_planner(obstacle)?, false)?;
        }
        Ok(grid)
    }
}
