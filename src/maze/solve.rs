//! Shortest path through open walls (BFS)

use std::collections::VecDeque;

use super::grid::{CellPos, MazeGrid};

/// Shortest cell path from `from` to `to`, both ends included
pub fn shortest_path(grid: &MazeGrid, from: CellPos, to: CellPos) -> Option<Vec<CellPos>> {
    if !grid.contains(from) || !grid.contains(to) {
        return None;
    }

    let mut came_from: Vec<Option<CellPos>> = vec![None; grid.len()];
    let mut seen = vec![false; grid.len()];
    let mut queue = VecDeque::from([from]);
    seen[grid.index_of(from)] = true;

    while let Some(pos) = queue.pop_front() {
        if pos == to {
            let mut path = vec![to];
            let mut cursor = to;
            while let Some(prev) = came_from[grid.index_of(cursor)] {
                path.push(prev);
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }

        for next in grid.open_neighbors(pos) {
            let idx = grid.index_of(next);
            if !seen[idx] {
                seen[idx] = true;
                came_from[idx] = Some(pos);
                queue.push_back(next);
            }
        }
    }

    None
}

impl MazeGrid {
    /// Shortest path from start to finish
    pub fn solution(&self) -> Option<Vec<CellPos>> {
        shortest_path(self, self.start, self.finish)
    }
}
