use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub mod config;
pub mod controller;
pub mod coords;
pub mod inventory;
pub mod map;
pub mod pathfinding;
pub mod planner;
pub mod policy;
pub mod runner;
pub mod world;

pub use map::GridCell;

/// A cell in environment coordinates.
///
/// Both axes start at 1 and the origin is the bottom-left corner, so `y`
/// grows upward. Planner-side cells use [`GridCell`] instead; the two only
/// meet inside [`coords::CoordinateMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Applies a move, returning `None` if either axis would drop below zero.
    pub fn offset(self, mv: Move) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(mv.dx)?,
            y: self.y.checked_add_signed(mv.dy)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A single step in environment coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub dx: isize,
    pub dy: isize,
}

impl Move {
    pub const fn new(dx: isize, dy: isize) -> Self {
        Self { dx, dy }
    }

    /// The delta between two cells.
    pub fn between(from: Position, to: Position) -> Self {
        Self {
            dx: to.x as isize - from.x as isize,
            dy: to.y as isize - from.y as isize,
        }
    }

    /// True for the four cardinal unit moves.
    #[inline]
    pub fn is_unit(&self) -> bool {
        self.dx.abs() + self.dy.abs() == 1
    }
}

/// The objects placed in the world.
///
/// The declaration order is also the iteration order used for placement and
/// pickup, which keeps seeded runs reproducible.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ObjectId {
    #[serde(rename = "B")]
    Brush,
    #[serde(rename = "Cl")]
    Color,
    #[serde(rename = "K")]
    Key,
    #[serde(rename = "Cd")]
    Code,
    #[serde(rename = "T")]
    Table,
    #[serde(rename = "Ch")]
    Chair,
    #[serde(rename = "D")]
    Door,
}

impl ObjectId {
    pub const ALL: [ObjectId; 7] = [
        ObjectId::Brush,
        ObjectId::Color,
        ObjectId::Key,
        ObjectId::Code,
        ObjectId::Table,
        ObjectId::Chair,
        ObjectId::Door,
    ];

    /// Supplies needed to paint a target.
    pub const PAINT_SUPPLIES: [ObjectId; 2] = [ObjectId::Brush, ObjectId::Color];

    /// Supplies needed to open the door.
    pub const DOOR_SUPPLIES: [ObjectId; 2] = [ObjectId::Key, ObjectId::Code];

    /// Portable objects can be carried; the rest never leave their cell.
    pub fn is_portable(self) -> bool {
        matches!(
            self,
            ObjectId::Brush | ObjectId::Color | ObjectId::Key | ObjectId::Code
        )
    }

    /// The short code used in maps, logs and the UI.
    pub fn code(self) -> &'static str {
        match self {
            ObjectId::Brush => "B",
            ObjectId::Color => "Cl",
            ObjectId::Key => "K",
            ObjectId::Code => "Cd",
            ObjectId::Table => "T",
            ObjectId::Chair => "Ch",
            ObjectId::Door => "D",
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown object code '{0}'")]
pub struct UnknownObject(pub String);

impl FromStr for ObjectId {
    type Err = UnknownObject;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::ALL
            .into_iter()
            .find(|id| id.code() == s)
            .ok_or_else(|| UnknownObject(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_codes_parse_back() {
        for id in ObjectId::ALL {
            assert_eq!(id.code().parse::<ObjectId>(), Ok(id));
        }
        assert!("X".parse::<ObjectId>().is_err());
    }

    #[test]
    fn portable_objects_are_the_supplies() {
        let portable: Vec<_> = ObjectId::ALL.into_iter().filter(|o| o.is_portable()).collect();
        assert_eq!(
            portable,
            [ObjectId::PAINT_SUPPLIES, ObjectId::DOOR_SUPPLIES].concat()
        );
    }

    #[test]
    fn offset_refuses_to_underflow() {
        assert_eq!(Position::new(0, 3).offset(Move::new(-1, 0)), None);
        assert_eq!(
            Position::new(2, 3).offset(Move::new(0, -1)),
            Some(Position::new(2, 2))
        );
        assert!(Move::between(Position::new(1, 1), Position::new(1, 2)).is_unit());
        assert!(!Move::between(Position::new(1, 1), Position::new(2, 2)).is_unit());
    }
}
