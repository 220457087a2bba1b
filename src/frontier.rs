use std::collections::VecDeque;

use crate::error::{Result, SimError};

/// First-in first-out queue of grid coordinates for the breadth-first search.
#[derive(Debug, Default)]
pub struct FrontierQueue {
    items: VecDeque<(usize, usize)>,
}

impl FrontierQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, x: usize, y: usize) {
        self.items.push_back((x, y));
    }

    /// Removes the oldest coordinate. Callers check `is_empty` first.
    pub fn pop_front(&mut self) -> Result<(usize, usize)> {
        self.items.pop_front().ok_or(SimError::EmptyQueueAccess)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
