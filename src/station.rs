use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::map::Grid;
use crate::pathfinding::{SearchResult, find_nearest_marker};
use crate::presenter::{Presenter, SimulationEvent};
use crate::robot::Robot;
use crate::types::{Cell, Direction};

/// One completed trip: home → marker → home.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub marker: (usize, usize),
    /// Steps from home to the marker (the trip is twice as long).
    pub distance: usize,
}

/// Totals of a whole collection run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub rounds: usize,
    /// Markers delivered home, in pickup order.
    pub collected: Vec<(usize, usize)>,
    /// Forward steps walked, both ways.
    pub steps: usize,
    /// Markers still on the grid once nothing more is reachable.
    pub unreachable: usize,
}

/// Home base: sends the robot after the nearest marker until none is
/// reachable any more.
///
/// Owns the world state of one simulation; nothing is shared between
/// stations.
#[derive(Debug)]
pub struct Station {
    grid: Grid,
    robot: Robot,
    report: CollectionReport,
}

impl Station {
    /// Puts a robot on the home cell, facing `facing`.
    pub fn new(grid: Grid, facing: Direction) -> Self {
        let robot = Robot::at_home(&grid, facing);
        Self {
            grid,
            robot,
            report: CollectionReport::default(),
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn robot(&self) -> &Robot {
        &self.robot
    }

    /// Sends the complete world to the presenter.
    pub fn announce(&self, presenter: &mut impl Presenter) {
        presenter.notify(&SimulationEvent::WorldLoaded {
            size: self.grid.size(),
            cells: self.grid.cells().to_vec(),
            home: self.grid.home(),
            robot: self.robot.pose(),
        });
    }

    /// Fetches the nearest reachable marker and brings it home.
    /// Returns `None` once no marker is reachable.
    ///
    /// The search always starts from the home cell, where the robot waits
    /// between rounds.
    pub fn run_round(&mut self, presenter: &mut impl Presenter) -> Result<Option<RoundSummary>> {
        let (home_x, home_y) = self.grid.home();
        let SearchResult::Found { marker, path } = find_nearest_marker(&self.grid, home_x, home_y)?
        else {
            return Ok(None);
        };
        debug!(?marker, ?path, "heading out");

        for &direction in &path {
            self.robot.go_to(direction, &mut self.grid, presenter)?;
        }
        for &direction in path.iter().rev() {
            self.robot.go_to(direction.opposite(), &mut self.grid, presenter)?;
        }

        presenter.notify(&SimulationEvent::HomeRestored {
            x: home_x,
            y: home_y,
        });
        let delivered = self.robot.drop_off();
        let pose = self.robot.pose();
        presenter.notify(&SimulationEvent::RobotPlaced {
            x: pose.x,
            y: pose.y,
            facing: pose.facing,
            carrying: pose.carrying,
        });

        self.report.rounds += 1;
        self.report.steps += 2 * path.len();
        if delivered {
            self.report.collected.push(marker);
        }
        info!(
            round = self.report.rounds,
            x = marker.0,
            y = marker.1,
            distance = path.len(),
            "marker delivered home"
        );

        Ok(Some(RoundSummary {
            marker,
            distance: path.len(),
        }))
    }

    /// Announces the world, collects every reachable marker and reports the
    /// end of the run.
    pub fn run(&mut self, presenter: &mut impl Presenter) -> Result<CollectionReport> {
        info!(
            size = self.grid.size(),
            markers = self.grid.count(Cell::Marker),
            obstacles = self.grid.count(Cell::Obstacle),
            "collection started"
        );
        self.announce(presenter);

        while self.run_round(presenter)?.is_some() {}

        self.report.unreachable = self.grid.count(Cell::Marker);
        presenter.notify(&SimulationEvent::RunFinished {
            collected: self.report.collected.len(),
            unreachable: self.report.unreachable,
        });
        info!(
            rounds = self.report.rounds,
            steps = self.report.steps,
            unreachable = self.report.unreachable,
            "all reachable markers have been collected"
        );
        Ok(self.report.clone())
    }
}
