//! Path searches used to steer the agents
//!
//! Both variants take a start, a goal and a set of blocked cells and return
//! the route (start and goal inclusive) together with the number of nodes
//! they expanded getting there. The expansion count is reported even when
//! no route exists, it is the figure the race compares.

mod astar;
mod bfs;

use fxhash::FxHashMap;
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::grid::Grid;
use crate::types::Position;

pub use astar::AStar;
pub use bfs::BreadthFirst;

/// cells a search must route around
pub type BlockedSet = FxHashSet<Position>;

/// the outcome of a single search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// start to goal inclusive, `None` when the goal can't be reached
    pub path: Option<Vec<Position>>,
    /// nodes taken off the frontier, one per pop
    pub expanded: u64,
}

impl SearchResult {
    /// the cell after `start` on the route, if the route has one
    pub fn next_step(&self) -> Option<Position> {
        self.path.as_ref().and_then(|p| p.get(1).copied())
    }

    /// number of moves on the route
    pub fn moves(&self) -> Option<usize> {
        self.path.as_ref().map(|p| p.len().saturating_sub(1))
    }
}

/// A search that can route an agent across a grid
pub trait PathSearch: fmt::Debug {
    /// find a route from `start` to `goal` that never enters a `blocked` cell
    fn search(
        &self,
        grid: &Grid,
        start: Position,
        goal: Position,
        blocked: &BlockedSet,
    ) -> SearchResult;
}

/// The two competing search strategies. Each agent holds one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// layer by layer FIFO search
    BreadthFirst,
    /// best first on g + manhattan distance
    AStar,
}

impl Algorithm {
    /// both algorithms, in the order they're reported
    pub const ALL: [Algorithm; 2] = [Algorithm::BreadthFirst, Algorithm::AStar];

    /// short label used in logs and the results log column prefix
    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::BreadthFirst => "bfs",
            Algorithm::AStar => "astar",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::BreadthFirst => write!(f, "BFS"),
            Algorithm::AStar => write!(f, "A*"),
        }
    }
}

impl PathSearch for Algorithm {
    fn search(
        &self,
        grid: &Grid,
        start: Position,
        goal: Position,
        blocked: &BlockedSet,
    ) -> SearchResult {
        match self {
            Algorithm::BreadthFirst => BreadthFirst.search(grid, start, goal, blocked),
            Algorithm::AStar => AStar.search(grid, start, goal, blocked),
        }
    }
}

/// walk the parent links back from `goal` and flip them into a start-first route
fn reconstruct_path(parents: &FxHashMap<Position, Position>, goal: Position) -> Vec<Position> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = parents.get(&current) {
        current = *prev;
        path.push(current);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(cells: &[(i32, i32)]) -> BlockedSet {
        cells.iter().map(|&(x, y)| Position::new(x, y)).collect()
    }

    #[test]
    fn test_open_board_scenario() {
        let grid = Grid::new(20, 20);
        let start = Position::new(10, 10);
        let goal = Position::new(15, 10);
        let none = BlockedSet::default();

        let bfs = Algorithm::BreadthFirst.search(&grid, start, goal, &none);
        let astar = Algorithm::AStar.search(&grid, start, goal, &none);

        assert_eq!(bfs.path.as_ref().map(Vec::len), Some(6));
        assert_eq!(astar.path.as_ref().map(Vec::len), Some(6));
        assert!(bfs.expanded >= 6);
        assert!(astar.expanded <= bfs.expanded);
        assert_eq!(bfs.next_step(), Some(Position::new(11, 10)));
        assert_eq!(astar.next_step(), Some(Position::new(11, 10)));
        assert_eq!(astar.moves(), Some(5));
    }

    #[test]
    fn test_both_route_around_a_wall() {
        let grid = Grid::new(7, 7);
        // wall at x = 3 with a single gap at y = 6
        let wall: Vec<(i32, i32)> = (0..6).map(|y| (3, y)).collect();
        let blocked = blocked(&wall);
        let start = Position::new(0, 0);
        let goal = Position::new(6, 0);

        for algorithm in Algorithm::ALL {
            let res = algorithm.search(&grid, start, goal, &blocked);
            let path = res.path.expect("a route through the gap exists");
            assert_eq!(path.first(), Some(&start));
            assert_eq!(path.last(), Some(&goal));
            assert_eq!(path.len(), 19, "{}", algorithm);
            assert!(path.iter().all(|p| !blocked.contains(p)));
            for (a, b) in path.iter().zip(path.iter().skip(1)) {
                assert_eq!(a.manhattan_distance(b), 1);
            }
        }
    }

    #[test]
    fn test_unreachable_goal() {
        let grid = Grid::new(5, 5);
        let blocked = blocked(&[(3, 4), (4, 3)]);
        let start = Position::new(0, 0);
        let goal = Position::new(4, 4);

        let bfs = Algorithm::BreadthFirst.search(&grid, start, goal, &blocked);
        let astar = Algorithm::AStar.search(&grid, start, goal, &blocked);
        assert_eq!(bfs.path, None);
        assert_eq!(astar.path, None);
        // every open cell but the sealed goal gets expanded
        assert_eq!(bfs.expanded, 22);
        assert_eq!(astar.expanded, 22);
    }

    #[test]
    fn test_goal_adjacent_to_start() {
        let grid = Grid::new(20, 20);
        let none = BlockedSet::default();
        let start = Position::new(3, 3);
        let goal = Position::new(4, 3);
        let bfs = Algorithm::BreadthFirst.search(&grid, start, goal, &none);
        let astar = Algorithm::AStar.search(&grid, start, goal, &none);
        assert_eq!(bfs.path, Some(vec![start, goal]));
        assert_eq!(astar.path, Some(vec![start, goal]));
        // start then goal, the +x neighbour is queued first
        assert_eq!(bfs.expanded, 2);
        assert_eq!(astar.expanded, 2);
    }

    #[test]
    fn test_start_is_goal() {
        let grid = Grid::new(4, 4);
        let p = Position::new(1, 1);
        for algorithm in Algorithm::ALL {
            let res = algorithm.search(&grid, p, p, &BlockedSet::default());
            assert_eq!(res.path, Some(vec![p]));
            assert_eq!(res.expanded, 1);
            assert_eq!(res.next_step(), None);
        }
    }
}
