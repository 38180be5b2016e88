//! Food placement
//!
//! Each agent owns its own random source. Both agents' sources are seeded
//! with the race seed and consumed the same way (an x draw then a y draw per
//! attempt), so the two boards see identical food until their bodies diverge.

use std::collections::VecDeque;

use rand::Rng;

use crate::grid::Grid;
use crate::types::Position;

/// Pick a uniformly random cell not covered by `body`, by rejection sampling.
///
/// Returns `None` without consuming randomness when the body covers the whole grid.
pub fn spawn_food<R: Rng + ?Sized>(
    grid: &Grid,
    body: &VecDeque<Position>,
    rng: &mut R,
) -> Option<Position> {
    if body.len() >= grid.area() {
        return None;
    }
    loop {
        let x = rng.gen_range(0..grid.width()) as i32;
        let y = rng.gen_range(0..grid.height()) as i32;
        let candidate = Position::new(x, y);
        if !body.contains(&candidate) {
            return Some(candidate);
        }
    }
}
