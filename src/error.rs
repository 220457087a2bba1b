use thiserror::Error;

use crate::types::Direction;

/// Every failure the simulation core can report.
///
/// `OutOfRange`, `EmptyQueueAccess`, `InvalidMove` and `BrokenTrail` are
/// programming faults: the search and the actuator are built so they never
/// happen. `Configuration` is raised before any simulation state exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("position ({x}, {y}) is outside the {size}x{size} grid")]
    OutOfRange { x: usize, y: usize, size: usize },

    #[error("pop from an empty frontier queue")]
    EmptyQueueAccess,

    #[error("robot at ({x}, {y}) facing {facing} cannot step forward")]
    InvalidMove { x: usize, y: usize, facing: Direction },

    #[error("no parent recorded for ({x}, {y}) while tracing a path back home")]
    BrokenTrail { x: usize, y: usize },

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
