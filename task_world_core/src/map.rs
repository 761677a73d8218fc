use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Cell ({x}, {y}) is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("Position {position} is off the {size}x{size} world")]
    OffWorld { position: Position, size: usize },
    #[error("Grid of {width}x{height} cells overflows usize")]
    TooLarge { width: usize, height: usize },
}

/// A cell in planner coordinates: 0-indexed, origin top-left, `y` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: usize,
    pub y: usize,
}

impl GridCell {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(&self, other: &GridCell) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A rectangular grid stored row-major, addressed by [`GridCell`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid whose cells are produced by `f(x, y)`, row by row.
    ///
    /// Fails with [`GridError::TooLarge`] if `width * height` overflows `usize`.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Result<Self, GridError>
    where
        F: FnMut(usize, usize) -> T,
    {
        let size = width
            .checked_mul(height)
            .ok_or(GridError::TooLarge { width, height })?;
        let mut cells = Vec::with_capacity(size);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(x, y));
            }
        }
        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index_of(&self, cell: GridCell) -> Option<usize> {
        self.contains(cell).then(|| cell.y * self.width + cell.x)
    }

    /// Checks if the cell lies inside the grid.
    #[inline]
    pub fn contains(&self, cell: GridCell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    pub fn get(&self, cell: GridCell) -> Option<&T> {
        self.index_of(cell).map(|index| &self.cells[index])
    }

    /// Sets the value of a cell, failing with [`GridError::OutOfBounds`] if
    /// the cell is outside the grid.
    pub fn set(&mut self, cell: GridCell, value: T) -> Result<(), GridError> {
        let index = self.index_of(cell).ok_or(GridError::OutOfBounds {
            x: cell.x,
            y: cell.y,
            width: self.width,
            height: self.height,
        })?;
        self.cells[index] = value;
        Ok(())
    }

    /// The in-bounds 4-neighbours of a cell, in right, down, left, up order.
    pub fn neighbours(&self, cell: GridCell) -> impl Iterator<Item = GridCell> + '_ {
        const DIRECTIONS: [(isize, isize); 4] = [(1, 0), (0, 1), (-1, 0), (0, -1)];
        DIRECTIONS.into_iter().filter_map(move |(dx, dy)| {
            let next = GridCell {
                x: cell.x.checked_add_signed(dx)?,
                y: cell.y.checked_add_signed(dy)?,
            };
            self.contains(next).then_some(next)
        })
    }

    /// Yields `(cell, &T)` for each cell in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (GridCell, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, value)| (GridCell::new(index % width, index / width), value))
    }
}

impl<T> Index<GridCell> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: GridCell) -> &Self::Output {
        match self.index_of(cell) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.y, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<GridCell> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, cell: GridCell) -> &mut Self::Output {
        let (width, height) = (self.width, self.height);
        match self.index_of(cell) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid size ({}, {})",
                cell.x, cell.y, width, height
            ),
        }
    }
}
