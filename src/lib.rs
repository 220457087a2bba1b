// Homerun library
// Exposes every module to the binaries (local run, simulation server, viewer)

pub mod types;        // Base types (Cell, Direction)
pub mod error;        // Error taxonomy
pub mod map;          // Grid storage and bounds checks
pub mod frontier;     // FIFO queue for the search
pub mod pathfinding;  // Breadth-first search and path reconstruction
pub mod robot;        // Robot motion state machine
pub mod station;      // Collection loop
pub mod presenter;    // Event sinks
pub mod generator;    // Random world generation
pub mod config;       // Command line and environment configuration
pub mod display;      // Terminal rendering
pub mod network;      // Event streaming to remote viewers
pub mod logging;      // Subscriber setup for the binaries

// Re-exports of the main types
pub use error::{Result, SimError};
pub use map::Grid;
pub use pathfinding::{SearchResult, find_nearest_marker};
pub use presenter::{Presenter, SimulationEvent};
pub use robot::Robot;
pub use station::{CollectionReport, Station};
pub use types::*;
