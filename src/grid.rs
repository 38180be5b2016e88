//! The bounded board every agent lives on
//!
//! Only orthogonal movement exists. Neighbor order is fixed (+x, -x, +y, -y)
//! and is the tie-break source for both search exploration order and the
//! agents' fallback moves.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::types::{Move, Position};

/// A fixed size grid, cells are `[0, width) x [0, height)`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
}

impl Grid {
    /// Build a grid. Dimensions are checked by `RaceConfig::validate`, not here.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Get the width of this grid
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height of this grid
    pub fn height(&self) -> u32 {
        self.height
    }

    /// number of cells on the grid
    pub fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// the cell agents are spawned on
    pub fn center(&self) -> Position {
        Position::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// is this position on the board
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// returns the in-bounds neighbors of `pos`, and the Move required to get to each,
    /// in `Move::ALL` order
    pub fn possible_moves(&self, pos: Position) -> impl Iterator<Item = (Move, Position)> + '_ {
        Move::ALL
            .into_iter()
            .map(move |mv| (mv, pos.add_vec(mv.to_vector())))
            .filter(move |(_, next)| self.contains(*next))
    }

    /// returns the in-bounds neighboring positions in `Move::ALL` order
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        self.possible_moves(pos).map(|(_, next)| next)
    }

    /// every cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = Position> {
        (0..self.height as i32)
            .cartesian_product(0..self.width as i32)
            .map(|(y, x)| Position::new(x, y))
    }
}
