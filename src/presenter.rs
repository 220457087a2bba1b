//! # Presenter Module
//!
//! The simulation core reports every visible state change as a
//! [`SimulationEvent`] to a [`Presenter`]. Presenters are write-only sinks:
//! the core never reads anything back from them.
//!
//! Implementations in this crate:
//! - [`NullPresenter`]: headless runs
//! - [`RecordingPresenter`]: keeps every event, used by tests
//! - [`Paced`]: wraps another presenter and sleeps before each robot motion
//! - [`Fanout`]: forwards to several presenters
//! - `display::TerminalDisplay` and `network::ChannelPresenter`

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{Cell, Direction};

/// Everything a presenter can be told about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimulationEvent {
    /// Full world contents. Sent before the first round, and to late joiners.
    WorldLoaded {
        size: usize,
        /// Row-major cells, `cells[y * size + x]`
        cells: Vec<Cell>,
        home: (usize, usize),
        robot: RobotPose,
    },
    /// The robot is about to leave (x, y); the cell should be redrawn empty.
    RobotLeft { x: usize, y: usize },
    /// The robot now stands on (x, y).
    RobotPlaced {
        x: usize,
        y: usize,
        facing: Direction,
        carrying: bool,
    },
    /// One quarter turn in place.
    RobotRotated { x: usize, y: usize, facing: Direction },
    MarkerCollected { x: usize, y: usize },
    /// The marker was dropped at home; home should be drawn again.
    HomeRestored { x: usize, y: usize },
    /// No marker is reachable any more.
    RunFinished { collected: usize, unreachable: usize },
}

/// Position, heading and load of the robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotPose {
    pub x: usize,
    pub y: usize,
    pub facing: Direction,
    pub carrying: bool,
}

pub trait Presenter {
    fn notify(&mut self, event: &SimulationEvent);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn notify(&mut self, event: &SimulationEvent) {
        (**self).notify(event);
    }
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn notify(&mut self, event: &SimulationEvent) {
        (**self).notify(event);
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn notify(&mut self, _event: &SimulationEvent) {}
}

/// Keeps a copy of every event in arrival order.
#[derive(Debug, Default, Clone)]
pub struct RecordingPresenter {
    pub events: Vec<SimulationEvent>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Headings reported by rotation events, in order.
    pub fn headings(&self) -> Vec<Direction> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SimulationEvent::RobotRotated { facing, .. } => Some(*facing),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn notify(&mut self, event: &SimulationEvent) {
        self.events.push(event.clone());
    }
}

/// Sleeps `delay` before every turn step and every forward step, then
/// forwards the event. A zero delay never sleeps.
#[derive(Debug)]
pub struct Paced<P> {
    inner: P,
    delay: Duration,
}

impl<P: Presenter> Paced<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: Presenter> Presenter for Paced<P> {
    fn notify(&mut self, event: &SimulationEvent) {
        let paced = matches!(
            event,
            SimulationEvent::RobotRotated { .. } | SimulationEvent::RobotLeft { .. }
        );
        if paced && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.inner.notify(event);
    }
}

/// Forwards each event to every wrapped presenter, in order.
#[derive(Default)]
pub struct Fanout {
    targets: Vec<Box<dyn Presenter + Send>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, presenter: impl Presenter + Send + 'static) -> Self {
        self.targets.push(Box::new(presenter));
        self
    }
}

impl Presenter for Fanout {
    fn notify(&mut self, event: &SimulationEvent) {
        for target in &mut self.targets {
            target.notify(event);
        }
    }
}
