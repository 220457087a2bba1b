//! # Network Communication Protocol Module
//!
//! Streams the simulation to remote viewers over TCP.
//!
//! ## Protocol
//!
//! Every [`SimulationEvent`] is serialized as one JSON object followed by a
//! newline. A viewer that connects while a run is in progress first receives
//! a snapshot of the current world (`world_loaded`, plus `run_finished` when
//! the run is over) and then the live events.
//!
//! ## Pieces
//!
//! - [`WorldView`]: world state rebuilt from events, used by the server for
//!   snapshots and by viewers for rendering
//! - [`ChannelPresenter`]: presenter living on the simulation thread, hands
//!   events to the async side through a bounded channel
//! - [`EventServer`]: accepts viewers and broadcasts events to them; every
//!   viewer has its own writer task, and one that stops reading is dropped
//! - [`SimulationThread`]: the collection run on its own OS thread, with its
//!   failure observable from the async side

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Result as SimResult, SimError};
use crate::presenter::{Presenter, RobotPose, SimulationEvent};
use crate::station::CollectionReport;
use crate::types::Cell;

/// Default TCP port of the simulation server.
///
/// Viewers connect to `127.0.0.1:8080` when running locally.
pub const DEFAULT_PORT: u16 = 8080;

/// Largest accepted line (1 MiB). A 20x20 world snapshot is about 4 KB.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Capacity of the channel between the simulation thread and the server.
pub const EVENT_BUFFER: usize = 100;

/// Lines queued for one viewer before the broadcaster starts waiting on it.
pub const VIEWER_BUFFER: usize = 256;

/// How long the broadcaster waits on a full viewer queue before dropping
/// that viewer.
pub const VIEWER_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// World state rebuilt from the event stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorldView {
    pub size: usize,
    /// Row-major cells, `cells[y * size + x]`
    pub cells: Vec<Cell>,
    pub home: (usize, usize),
    pub robot: Option<RobotPose>,
    /// `(collected, unreachable)` once the run is over
    pub finished: Option<(usize, usize)>,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `world_loaded` event has been applied.
    pub fn is_loaded(&self) -> bool {
        self.size > 0
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        if self.contains(x, y) {
            self.cells.get(y * self.size + x).copied()
        } else {
            None
        }
    }

    /// Markers picked up so far, including the one being carried.
    pub fn collected(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Collected).count()
    }

    /// Markers already dropped at home.
    pub fn delivered(&self) -> usize {
        let carrying = self.robot.is_some_and(|r| r.carrying);
        self.collected().saturating_sub(usize::from(carrying))
    }

    pub fn markers_left(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Marker).count()
    }

    fn contains(&self, x: usize, y: usize) -> bool {
        x < self.size && y < self.size
    }

    /// Folds one event into the view. A `world_loaded` whose cell list does
    /// not match its size, or whose robot stands outside it, is ignored, as
    /// are later positions outside the world.
    pub fn apply(&mut self, event: &SimulationEvent) {
        match event {
            SimulationEvent::WorldLoaded {
                size,
                cells,
                home,
                robot,
            } => {
                let fits = |(x, y): (usize, usize)| x < *size && y < *size;
                if size.checked_mul(*size) != Some(cells.len())
                    || !fits(*home)
                    || !fits((robot.x, robot.y))
                {
                    warn!(size, cells = cells.len(), "inconsistent world ignored");
                    return;
                }
                self.size = *size;
                self.cells = cells.clone();
                self.home = *home;
                self.robot = Some(*robot);
                self.finished = None;
            }
            SimulationEvent::RobotLeft { .. } => {}
            SimulationEvent::RobotPlaced {
                x,
                y,
                facing,
                carrying,
            } if self.contains(*x, *y) => {
                self.robot = Some(RobotPose {
                    x: *x,
                    y: *y,
                    facing: *facing,
                    carrying: *carrying,
                });
            }
            SimulationEvent::RobotRotated { x, y, facing } if self.contains(*x, *y) => {
                let carrying = self.robot.is_some_and(|r| r.carrying);
                self.robot = Some(RobotPose {
                    x: *x,
                    y: *y,
                    facing: *facing,
                    carrying,
                });
            }
            SimulationEvent::MarkerCollected { x, y } if self.contains(*x, *y) => {
                if let Some(cell) = self.cells.get_mut(y * self.size + x) {
                    *cell = Cell::Collected;
                }
            }
            SimulationEvent::HomeRestored { .. } => {
                if let Some(robot) = self.robot.as_mut() {
                    robot.carrying = false;
                }
            }
            SimulationEvent::RunFinished {
                collected,
                unreachable,
            } => {
                self.finished = Some((*collected, *unreachable));
            }
            SimulationEvent::RobotPlaced { x, y, .. }
            | SimulationEvent::RobotRotated { x, y, .. }
            | SimulationEvent::MarkerCollected { x, y } => {
                debug!(x, y, size = self.size, "event outside the world ignored");
            }
        }
    }

    /// Events that bring a fresh viewer up to date, empty before the world
    /// is loaded.
    pub fn snapshot(&self) -> Vec<SimulationEvent> {
        let Some(robot) = self.robot.filter(|_| self.is_loaded()) else {
            return Vec::new();
        };
        let mut events = vec![SimulationEvent::WorldLoaded {
            size: self.size,
            cells: self.cells.clone(),
            home: self.home,
            robot,
        }];
        if let Some((collected, unreachable)) = self.finished {
            events.push(SimulationEvent::RunFinished {
                collected,
                unreachable,
            });
        }
        events
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message of {0} bytes exceeds the {} byte limit", MAX_MESSAGE_SIZE)]
    TooLarge(usize),
    #[error("malformed event: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_event(event: &SimulationEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

/// Parses one received line (trailing newline allowed).
pub fn decode_event(line: &str) -> Result<SimulationEvent, DecodeError> {
    if line.len() > MAX_MESSAGE_SIZE {
        return Err(DecodeError::TooLarge(line.len()));
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Presenter for the simulation thread: pushes every event into the
/// server's channel, waiting when the channel is full.
///
/// Must not be used from inside the async runtime.
#[derive(Debug)]
pub struct ChannelPresenter {
    tx: mpsc::Sender<SimulationEvent>,
    closed: bool,
}

impl ChannelPresenter {
    pub fn new(tx: mpsc::Sender<SimulationEvent>) -> Self {
        Self { tx, closed: false }
    }
}

impl Presenter for ChannelPresenter {
    fn notify(&mut self, event: &SimulationEvent) {
        if self.closed {
            return;
        }
        if self.tx.blocking_send(event.clone()).is_err() {
            // NOTE - Server gone, the run goes on without broadcasting
            warn!("event channel closed, no longer broadcasting");
            self.closed = true;
        }
    }
}

async fn send_line(stream: &mut TcpStream, line: &str) -> io::Result<()> {
    stream.write_all(line.as_bytes()).await?;
    stream.write_all(b"\n").await
}

/// Drains one viewer's queue into its socket. Ends when the queue is
/// dropped or the socket fails.
async fn write_lines(mut stream: TcpStream, mut lines: mpsc::Receiver<Arc<str>>, addr: SocketAddr) {
    while let Some(line) = lines.recv().await {
        if let Err(e) = send_line(&mut stream, &line).await {
            debug!(%addr, error = %e, "viewer write failed");
            return;
        }
    }
}

/// One connected viewer: its queue and the task writing it out.
struct Viewer {
    addr: SocketAddr,
    lines: mpsc::Sender<Arc<str>>,
    writer: JoinHandle<()>,
}

/// Connected viewers plus the world state used for their snapshots.
#[derive(Default)]
struct Hub {
    view: WorldView,
    viewers: Vec<Viewer>,
}

impl Hub {
    fn add_viewer(&mut self, stream: TcpStream, addr: SocketAddr) {
        let (tx, rx) = mpsc::channel(VIEWER_BUFFER);
        for event in self.view.snapshot() {
            match encode_event(&event) {
                // the snapshot is at most two lines, the queue is empty
                Ok(line) => {
                    let _ = tx.try_send(Arc::from(line));
                }
                Err(e) => {
                    warn!(error = %e, "snapshot serialization failed");
                    return;
                }
            }
        }
        let writer = tokio::spawn(write_lines(stream, rx, addr));
        self.viewers.push(Viewer {
            addr,
            lines: tx,
            writer,
        });
        info!(%addr, viewers = self.viewers.len(), "viewer connected");
    }

    /// Queues the event for every viewer. A viewer whose queue stays full
    /// for `VIEWER_SEND_TIMEOUT` is dropped, so a stalled socket delays the
    /// broadcast by at most that long.
    async fn broadcast(&mut self, event: &SimulationEvent) {
        self.view.apply(event);
        let line: Arc<str> = match encode_event(event) {
            Ok(line) => Arc::from(line),
            Err(e) => {
                warn!(error = %e, "event serialization failed");
                return;
            }
        };

        let viewers = std::mem::take(&mut self.viewers);
        for viewer in viewers {
            match viewer
                .lines
                .send_timeout(Arc::clone(&line), VIEWER_SEND_TIMEOUT)
                .await
            {
                Ok(()) => self.viewers.push(viewer),
                Err(SendTimeoutError::Timeout(_)) => {
                    viewer.writer.abort();
                    warn!(addr = %viewer.addr, "viewer stopped reading, disconnected");
                }
                Err(SendTimeoutError::Closed(_)) => {
                    info!(addr = %viewer.addr, "viewer disconnected");
                }
            }
        }
    }

    fn close(self) {
        info!(viewers = self.viewers.len(), "server stopped");
        for viewer in self.viewers {
            viewer.writer.abort();
        }
    }
}

/// TCP server broadcasting simulation events to every connected viewer.
pub struct EventServer {
    listener: TcpListener,
    hub: Hub,
}

impl EventServer {
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            hub: Hub::default(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Broadcasts events until `shutdown` completes. Once the event channel
    /// closes, viewers can still connect and receive the final snapshot.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<SimulationEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> io::Result<()> {
        let EventServer { listener, mut hub } = self;
        let mut events_open = true;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => hub.add_viewer(stream, addr),
                    Err(e) => warn!(error = %e, "accept failed"),
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => hub.broadcast(&event).await,
                    None => {
                        events_open = false;
                        info!("simulation finished, serving final state");
                    }
                },
            }
        }

        hub.close();
        Ok(())
    }
}

/// A collection run on a dedicated OS thread.
///
/// The thread owns the simulation; the async side can wait for a failure
/// with [`SimulationThread::failure`] while it keeps serving viewers.
pub struct SimulationThread {
    handle: thread::JoinHandle<SimResult<CollectionReport>>,
    failure: Option<oneshot::Receiver<SimError>>,
}

impl SimulationThread {
    /// Starts `run` on a new thread. An error is logged the moment the run
    /// ends, not when the thread is joined.
    pub fn spawn<F>(run: F) -> Self
    where
        F: FnOnce() -> SimResult<CollectionReport> + Send + 'static,
    {
        let (failure_tx, failure_rx) = oneshot::channel();
        let handle = thread::spawn(move || {
            let outcome = run();
            if let Err(e) = &outcome {
                error!(error = %e, "collection run failed");
                let _ = failure_tx.send(e.clone());
            }
            outcome
        });
        Self {
            handle,
            failure: Some(failure_rx),
        }
    }

    /// Resolves with the error if the run fails; never resolves if it
    /// succeeds.
    pub async fn failure(&mut self) -> SimError {
        if let Some(rx) = self.failure.take() {
            if let Ok(e) = rx.await {
                return e;
            }
        }
        std::future::pending().await
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the thread. `Err` means it panicked.
    pub fn join(self) -> thread::Result<SimResult<CollectionReport>> {
        self.handle.join()
    }
}
