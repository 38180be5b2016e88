//! movement vocabulary shared by the grid, the searches and the agents
use serde::{Deserialize, Serialize};
use std::fmt;

/// A vector with which to do positional math
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector {
    /// x offset
    pub x: i32,
    /// y offset
    pub y: i32,
}

/// A cell on a grid. `x` grows to the right, `y` grows "up" (`Move::Up`).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// column
    pub x: i32,
    /// row
    pub y: i32,
}

impl Position {
    /// builds a position
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// moves this position by the given vector
    pub fn add_vec(&self, v: Vector) -> Position {
        Position {
            x: self.x + v.x,
            y: self.y + v.y,
        }
    }

    /// moves this position against the given vector
    pub fn sub_vec(&self, v: Vector) -> Position {
        Position {
            x: self.x - v.x,
            y: self.y - v.y,
        }
    }

    /// treat this position as an offset from the origin
    pub fn to_vector(&self) -> Vector {
        Vector {
            x: self.x,
            y: self.y,
        }
    }

    /// |dx| + |dy|, the admissible estimate used by A*
    pub fn manhattan_distance(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Represents a move. Variant order is the fixed tie-break order used
/// everywhere a choice between directions has to be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    /// +x
    Right,
    /// -x
    Left,
    /// +y
    Up,
    /// -y
    Down,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Left => write!(f, "left"),
            Move::Right => write!(f, "right"),
            Move::Up => write!(f, "up"),
            Move::Down => write!(f, "down"),
        }
    }
}

impl Move {
    /// every move, in tie-break order: +x, -x, +y, -y
    pub const ALL: [Move; 4] = [Move::Right, Move::Left, Move::Up, Move::Down];

    /// convert this move to a vector
    pub fn to_vector(self) -> Vector {
        match self {
            Move::Left => Vector { x: -1, y: 0 },
            Move::Right => Vector { x: 1, y: 0 },
            Move::Up => Vector { x: 0, y: 1 },
            Move::Down => Vector { x: 0, y: -1 },
        }
    }

    /// create a Move from a unit orthogonal vector, `None` for anything else
    pub fn from_vector(vector: Vector) -> Option<Self> {
        match vector {
            Vector { x: -1, y: 0 } => Some(Self::Left),
            Vector { x: 1, y: 0 } => Some(Self::Right),
            Vector { x: 0, y: 1 } => Some(Self::Up),
            Vector { x: 0, y: -1 } => Some(Self::Down),
            _ => None,
        }
    }

    /// the move that takes `from` to the adjacent cell `to`
    pub fn between(from: Position, to: Position) -> Option<Self> {
        Self::from_vector(to.sub_vec(from.to_vector()).to_vector())
    }
}
