//! Breadth-first search from the home cell to the nearest marker.
//!
//! Neighbours are always expanded North, East, South, West. When several
//! shortest paths exist, the first one discovered under that order wins, so
//! the result is deterministic for a given grid.

use tracing::trace;

use crate::error::{Result, SimError};
use crate::frontier::FrontierQueue;
use crate::map::Grid;
use crate::types::{Cell, Direction};

/// Outcome of one search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchResult {
    /// No marker can be reached from home.
    Unreachable,
    /// Nearest marker and the directions to walk from home to reach it.
    Found {
        marker: (usize, usize),
        path: Vec<Direction>,
    },
}

impl SearchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchResult::Found { .. })
    }

    /// Outbound directions, empty when nothing was found.
    pub fn path(&self) -> &[Direction] {
        match self {
            SearchResult::Found { path, .. } => path,
            SearchResult::Unreachable => &[],
        }
    }
}

/// Per-cell direction pointing back toward the search origin.
///
/// Flat `size * size` table indexed like the grid. Only lives for the
/// duration of one search.
#[derive(Clone, Debug)]
pub struct ParentMap {
    size: usize,
    parents: Vec<Option<Direction>>,
}

impl ParentMap {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            parents: vec![None; size * size],
        }
    }

    /// Records that walking `back` from (x, y) leads to its parent.
    pub fn record(&mut self, x: usize, y: usize, back: Direction) {
        if x < self.size && y < self.size {
            self.parents[y * self.size + x] = Some(back);
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<Direction> {
        if x < self.size && y < self.size {
            self.parents[y * self.size + x]
        } else {
            None
        }
    }
}

/// Finds the marker closest to (home_x, home_y) and the path leading to it.
pub fn find_nearest_marker(grid: &Grid, home_x: usize, home_y: usize) -> Result<SearchResult> {
    grid.cell_at(home_x, home_y)?;

    let size = grid.size();
    let mut visited = vec![false; size * size];
    let mut parents = ParentMap::new(size);
    let mut frontier = FrontierQueue::new();

    visited[home_y * size + home_x] = true;
    frontier.push(home_x, home_y);

    while !frontier.is_empty() {
        let (x, y) = frontier.pop_front()?;

        if grid.cell_at(x, y)? == Cell::Marker {
            let path = trace_back_path(&parents, (home_x, home_y), (x, y))?;
            trace!(x, y, distance = path.len(), "nearest marker found");
            return Ok(SearchResult::Found {
                marker: (x, y),
                path,
            });
        }

        for travelled in Direction::ALL {
            let Some((nx, ny)) = travelled.step(x, y, size) else {
                continue;
            };
            let i = ny * size + nx;
            if visited[i] || grid.cell_at(nx, ny)? == Cell::Obstacle {
                continue;
            }
            visited[i] = true;
            parents.record(nx, ny, travelled.opposite());
            frontier.push(nx, ny);
        }
    }

    trace!(home_x, home_y, "no reachable marker");
    Ok(SearchResult::Unreachable)
}

/// Walks the parent table from `marker` back to `home` and returns the
/// directions in travel order, home first.
pub fn trace_back_path(
    parents: &ParentMap,
    home: (usize, usize),
    marker: (usize, usize),
) -> Result<Vec<Direction>> {
    let mut path = Vec::new();
    let (mut x, mut y) = marker;

    while (x, y) != home {
        // a path longer than the grid has cells means the table has a cycle
        if path.len() >= parents.size * parents.size {
            return Err(SimError::BrokenTrail { x, y });
        }
        let back = parents.get(x, y).ok_or(SimError::BrokenTrail { x, y })?;
        path.push(back.opposite());
        (x, y) = back.step(x, y, parents.size).ok_or(SimError::OutOfRange {
            x,
            y,
            size: parents.size,
        })?;
    }

    path.reverse();
    Ok(path)
}
