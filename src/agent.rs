//! A single racing snake and its movement rules
use std::collections::VecDeque;
use std::fmt;

use itertools::Itertools;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::food::spawn_food;
use crate::grid::Grid;
use crate::search::{Algorithm, BlockedSet, PathSearch};
use crate::types::{Move, Position};

/// What happened to an agent on one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// moved without eating
    Moved(Move),
    /// moved on to the food and grew by one
    Ate(Move),
    /// the chosen move left the grid or hit the body
    Died(Move),
    /// was already dead, nothing changed
    Dead,
}

/// One snake on its own grid, steered by one search algorithm.
///
/// The body is head first. While alive, body cells are distinct and on the grid.
#[derive(Debug, Clone)]
pub struct Agent {
    algorithm: Algorithm,
    grid: Grid,
    body: VecDeque<Position>,
    direction: Move,
    alive: bool,
    food: Position,
    foods_eaten: u32,
    nodes_expanded: u64,
    ticks_alive: u64,
    rng: SmallRng,
}

impl Agent {
    /// A fresh agent: one cell at the grid center, heading right, with its first
    /// food drawn from a random source seeded with `seed`.
    ///
    /// Panics on a grid with no cells, see [`Agent::with_body`].
    pub fn new(algorithm: Algorithm, grid: Grid, seed: u64) -> Self {
        Self::with_body(algorithm, grid, [grid.center()], Move::Right, seed)
    }

    /// An agent with an arbitrary starting body (head first). The first food is
    /// drawn from a random source seeded with `seed`, as in [`Agent::new`].
    ///
    /// # Panics
    ///
    /// if `body` is empty, has a cell off the grid, or repeats a cell
    pub fn with_body(
        algorithm: Algorithm,
        grid: Grid,
        body: impl IntoIterator<Item = Position>,
        direction: Move,
        seed: u64,
    ) -> Self {
        let body: VecDeque<Position> = body.into_iter().collect();
        assert!(
            body_is_valid(&grid, &body),
            "invalid starting body {:?} on a {}x{} grid",
            body,
            grid.width(),
            grid.height()
        );
        let mut rng = SmallRng::seed_from_u64(seed);
        let food = spawn_food(&grid, &body, &mut rng).unwrap_or_else(|| grid.center());
        Agent {
            algorithm,
            grid,
            body,
            direction,
            alive: true,
            food,
            foods_eaten: 0,
            nodes_expanded: 0,
            ticks_alive: 0,
            rng,
        }
    }

    /// place the food somewhere specific, replacing the current one
    pub fn set_food(&mut self, food: Position) {
        self.food = food;
    }

    /// the search steering this agent
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// the grid this agent lives on
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// body cells, head first
    pub fn body(&self) -> &VecDeque<Position> {
        &self.body
    }

    /// the head cell, `body()[0]`
    pub fn head(&self) -> Position {
        self.body[0]
    }

    /// the direction of the last move
    pub fn direction(&self) -> Move {
        self.direction
    }

    #[allow(missing_docs)]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// the food currently on this agent's grid
    pub fn food(&self) -> Position {
        self.food
    }

    #[allow(missing_docs)]
    pub fn foods_eaten(&self) -> u32 {
        self.foods_eaten
    }

    /// expansions summed over every search this agent has run
    pub fn nodes_expanded(&self) -> u64 {
        self.nodes_expanded
    }

    /// ticks this agent has taken a step on, frozen once it dies
    pub fn ticks_alive(&self) -> u64 {
        self.ticks_alive
    }

    /// checks the body invariants: non empty, on the grid, no repeated cells
    pub fn check_invariants(&self) -> bool {
        body_is_valid(&self.grid, &self.body)
    }

    /// Pick the next direction: follow the search route to the food when there
    /// is one, otherwise the first safe neighbour in `Move::ALL` order,
    /// otherwise keep going the same way.
    fn choose_move(&mut self) -> Move {
        let head = self.head();
        let blocked: BlockedSet = self.body.iter().skip(1).copied().collect();

        let result = self.algorithm.search(&self.grid, head, self.food, &blocked);
        self.nodes_expanded += result.expanded;
        trace!(
            algorithm = %self.algorithm,
            expanded = result.expanded,
            route = ?result.moves(),
            "searched for food"
        );

        if let Some(mv) = result.next_step().and_then(|next| Move::between(head, next)) {
            return mv;
        }

        self.grid
            .possible_moves(head)
            .find(|(_, next)| !blocked.contains(next))
            .map(|(mv, _)| mv)
            .unwrap_or(self.direction)
    }

    /// Advance one tick. A dead agent is left untouched.
    pub fn step(&mut self) -> StepOutcome {
        if !self.alive {
            return StepOutcome::Dead;
        }
        self.ticks_alive += 1;

        let mv = self.choose_move();
        self.direction = mv;
        let next = self.head().add_vec(mv.to_vector());

        if !self.grid.contains(next) || self.body.contains(&next) {
            self.alive = false;
            debug!(
                algorithm = %self.algorithm,
                head = %self.head(),
                %next,
                length = self.body.len(),
                "agent died"
            );
            return StepOutcome::Died(mv);
        }

        self.body.push_front(next);
        let outcome = if next == self.food {
            self.foods_eaten += 1;
            match spawn_food(&self.grid, &self.body, &mut self.rng) {
                Some(food) => self.food = food,
                None => warn!(algorithm = %self.algorithm, "no free cell left for food"),
            }
            debug!(
                algorithm = %self.algorithm,
                foods = self.foods_eaten,
                food = %self.food,
                "agent ate"
            );
            StepOutcome::Ate(mv)
        } else {
            self.body.pop_back();
            StepOutcome::Moved(mv)
        };
        debug_assert!(self.check_invariants());
        outcome
    }
}

fn body_is_valid(grid: &Grid, body: &VecDeque<Position>) -> bool {
    !body.is_empty()
        && body.iter().all(|p| grid.contains(*p))
        && body.iter().unique().count() == body.len()
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        for i in 0..self.grid.height() {
            let y = (self.grid.height() - i - 1) as i32;
            for x in 0..self.grid.width() as i32 {
                let position = Position::new(x, y);
                if self.head() == position {
                    write!(f, "H")?;
                } else if self.body.contains(&position) {
                    write!(f, "s")?;
                } else if self.food == position {
                    write!(f, "f")?;
                } else {
                    write!(f, ".")?;
                }
                write!(f, " ")?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "({} alive: {} length: {} foods: {} nodes: {})",
            self.algorithm,
            self.alive,
            self.body.len(),
            self.foods_eaten,
            self.nodes_expanded
        )
    }
}
