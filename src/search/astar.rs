use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fxhash::{FxHashMap, FxHashSet};
use tracing::instrument;

use super::{reconstruct_path, BlockedSet, PathSearch, SearchResult};
use crate::grid::Grid;
use crate::types::Position;

/// A* with unit edge costs and manhattan distance as the heuristic.
///
/// Frontier entries with equal `f` come off shallowest first (smaller `g`),
/// then in the order they were pushed, which decides between equally short
/// routes. Every pop counts as an expansion. An entry made stale by a cheaper
/// route to the same cell, or whose cell is already closed, is counted and
/// then dropped without visiting its neighbours.
#[derive(Debug, Clone, Copy, Default)]
pub struct AStar;

#[derive(Debug)]
struct OpenNode {
    f: u32,
    seq: u64,
    g: u32,
    pos: Position,
}

impl OpenNode {
    fn key(&self) -> (u32, u32, u64) {
        (self.f, self.g, self.seq)
    }
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so the max-heap pops the smallest (f, g, seq)
        other.key().cmp(&self.key())
    }
}

impl PathSearch for AStar {
    #[instrument(level = "trace", skip_all, fields(start = %start, goal = %goal))]
    fn search(
        &self,
        grid: &Grid,
        start: Position,
        goal: Position,
        blocked: &BlockedSet,
    ) -> SearchResult {
        let mut open = BinaryHeap::new();
        let mut seq = 0;
        let mut best_g: FxHashMap<Position, u32> = FxHashMap::default();
        let mut parents: FxHashMap<Position, Position> = FxHashMap::default();
        let mut closed: FxHashSet<Position> = FxHashSet::default();
        let mut expanded = 0;

        best_g.insert(start, 0);
        open.push(OpenNode {
            f: start.manhattan_distance(&goal),
            seq,
            g: 0,
            pos: start,
        });

        while let Some(node) = open.pop() {
            expanded += 1;
            let stale = best_g.get(&node.pos).map_or(false, |&g| g < node.g);
            if stale || !closed.insert(node.pos) {
                continue;
            }

            if node.pos == goal {
                return SearchResult {
                    path: Some(reconstruct_path(&parents, goal)),
                    expanded,
                };
            }

            let next_g = node.g + 1;
            for next in grid.neighbors(node.pos) {
                if blocked.contains(&next) || closed.contains(&next) {
                    continue;
                }
                if best_g.get(&next).map_or(false, |&g| g <= next_g) {
                    continue;
                }
                best_g.insert(next, next_g);
                parents.insert(next, node.pos);
                seq += 1;
                open.push(OpenNode {
                    f: next_g + next.manhattan_distance(&goal),
                    seq,
                    g: next_g,
                    pos: next,
                });
            }
        }

        SearchResult {
            path: None,
            expanded,
        }
    }
}
