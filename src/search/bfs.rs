use std::collections::VecDeque;

use fxhash::{FxHashMap, FxHashSet};
use tracing::instrument;

use super::{reconstruct_path, BlockedSet, PathSearch, SearchResult};
use crate::grid::Grid;
use crate::types::Position;

/// Breadth first search. Nodes are marked visited when they're queued, so
/// each cell is dequeued (and counted as an expansion) at most once.
#[derive(Debug, Clone, Copy, Default)]
pub struct BreadthFirst;

impl PathSearch for BreadthFirst {
    #[instrument(level = "trace", skip_all, fields(start = %start, goal = %goal))]
    fn search(
        &self,
        grid: &Grid,
        start: Position,
        goal: Position,
        blocked: &BlockedSet,
    ) -> SearchResult {
        let mut queue = VecDeque::from([start]);
        let mut visited: FxHashSet<Position> = FxHashSet::default();
        visited.insert(start);
        let mut parents: FxHashMap<Position, Position> = FxHashMap::default();
        let mut expanded = 0;

        while let Some(current) = queue.pop_front() {
            expanded += 1;

            if current == goal {
                return SearchResult {
                    path: Some(reconstruct_path(&parents, goal)),
                    expanded,
                };
            }

            for next in grid.neighbors(current) {
                if blocked.contains(&next) || !visited.insert(next) {
                    continue;
                }
                parents.insert(next, current);
                queue.push_back(next);
            }
        }

        SearchResult {
            path: None,
            expanded,
        }
    }
}
