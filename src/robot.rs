use tracing::{debug, trace};

use crate::error::{Result, SimError};
use crate::map::Grid;
use crate::presenter::{Presenter, RobotPose, SimulationEvent};
use crate::types::{Cell, Direction};

/// The robot's motion state: where it stands, where it faces and whether it
/// carries a marker.
///
/// Every action reports its visible effects to the presenter it is given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Robot {
    pub x: usize,
    pub y: usize,
    pub facing: Direction,
    pub carrying: bool,
}

impl Robot {
    pub fn new(x: usize, y: usize, facing: Direction) -> Self {
        Self {
            x,
            y,
            facing,
            carrying: false,
        }
    }

    /// Robot standing on the grid's home cell.
    pub fn at_home(grid: &Grid, facing: Direction) -> Self {
        let (x, y) = grid.home();
        Self::new(x, y, facing)
    }

    pub fn position(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    pub fn pose(&self) -> RobotPose {
        RobotPose {
            x: self.x,
            y: self.y,
            facing: self.facing,
            carrying: self.carrying,
        }
    }

    /// Rotates in place, one quarter turn at a time, on the shorter side.
    /// A half turn goes left.
    pub fn turn_toward(&mut self, target: Direction, presenter: &mut impl Presenter) {
        let clockwise = (target.index() + 4 - self.facing.index()) % 4;
        if clockwise == 0 {
            return;
        }
        let counter_clockwise = 4 - clockwise;
        let turn_left = counter_clockwise <= clockwise;

        while self.facing != target {
            self.facing = if turn_left {
                self.facing.turned_left()
            } else {
                self.facing.turned_right()
            };
            presenter.notify(&SimulationEvent::RobotRotated {
                x: self.x,
                y: self.y,
                facing: self.facing,
            });
        }
    }

    /// Moves one cell forward and picks up the marker found there, unless a
    /// marker is already carried.
    ///
    /// Leaving the grid or walking into an obstacle is refused with
    /// `InvalidMove` and the robot stays where it is.
    pub fn step_forward(&mut self, grid: &mut Grid, presenter: &mut impl Presenter) -> Result<()> {
        let invalid = SimError::InvalidMove {
            x: self.x,
            y: self.y,
            facing: self.facing,
        };
        let (nx, ny) = self
            .facing
            .step(self.x, self.y, grid.size())
            .ok_or_else(|| invalid.clone())?;
        if grid.cell_at(nx, ny)? == Cell::Obstacle {
            return Err(invalid);
        }

        presenter.notify(&SimulationEvent::RobotLeft {
            x: self.x,
            y: self.y,
        });
        self.x = nx;
        self.y = ny;
        trace!(x = nx, y = ny, facing = %self.facing, "step");

        if !self.carrying && grid.cell_at(nx, ny)? == Cell::Marker {
            grid.set_cell(nx, ny, Cell::Collected)?;
            self.carrying = true;
            debug!(x = nx, y = ny, "marker picked up");
            presenter.notify(&SimulationEvent::MarkerCollected { x: nx, y: ny });
        }

        presenter.notify(&SimulationEvent::RobotPlaced {
            x: self.x,
            y: self.y,
            facing: self.facing,
            carrying: self.carrying,
        });
        Ok(())
    }

    /// Faces `target`, then steps once.
    pub fn go_to(
        &mut self,
        target: Direction,
        grid: &mut Grid,
        presenter: &mut impl Presenter,
    ) -> Result<()> {
        self.turn_toward(target, presenter);
        self.step_forward(grid, presenter)
    }

    /// Releases the carried marker. Returns whether one was carried.
    pub fn drop_off(&mut self) -> bool {
        std::mem::replace(&mut self.carrying, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathfinding::find_nearest_marker;
    use crate::presenter::{NullPresenter, RecordingPresenter};
    use crate::types::Direction::{East, North, South, West};

    #[test]
    fn turning_takes_the_short_side() {
        let mut presenter = RecordingPresenter::new();

        let mut robot = Robot::new(0, 0, East);
        robot.turn_toward(North, &mut presenter);
        assert_eq!(presenter.headings(), vec![North]);

        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::new(0, 0, West);
        robot.turn_toward(North, &mut presenter);
        assert_eq!(presenter.headings(), vec![North]);
        assert_eq!(robot.facing, North);
    }

    #[test]
    fn half_turn_goes_left() {
        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::new(0, 0, North);
        robot.turn_toward(South, &mut presenter);
        assert_eq!(presenter.headings(), vec![West, South]);

        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::new(0, 0, East);
        robot.turn_toward(West, &mut presenter);
        assert_eq!(presenter.headings(), vec![North, West]);
    }

    #[test]
    fn facing_target_does_not_turn() {
        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::new(2, 2, South);
        robot.turn_toward(South, &mut presenter);
        assert!(presenter.events.is_empty());
    }

    #[test]
    fn step_picks_up_a_single_marker() {
        let mut grid = Grid::parse(
            "HMM
             ...
             ...",
        )
        .unwrap();
        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::at_home(&grid, East);

        robot.step_forward(&mut grid, &mut presenter).unwrap();
        assert!(robot.carrying);
        assert_eq!(grid.cell_at(1, 0).unwrap(), Cell::Collected);
        assert_eq!(
            presenter.events,
            vec![
                SimulationEvent::RobotLeft { x: 0, y: 0 },
                SimulationEvent::MarkerCollected { x: 1, y: 0 },
                SimulationEvent::RobotPlaced {
                    x: 1,
                    y: 0,
                    facing: East,
                    carrying: true
                },
            ]
        );

        robot.step_forward(&mut grid, &mut presenter).unwrap();
        assert_eq!(robot.position(), (2, 0));
        assert_eq!(grid.cell_at(2, 0).unwrap(), Cell::Marker);
        assert_eq!(grid.count(Cell::Collected), 1);
    }

    #[test]
    fn refuses_to_leave_the_grid_or_hit_obstacles() {
        let mut grid = Grid::parse(
            "H#
             ..",
        )
        .unwrap();
        let mut robot = Robot::at_home(&grid, North);
        assert_eq!(
            robot.step_forward(&mut grid, &mut NullPresenter),
            Err(SimError::InvalidMove {
                x: 0,
                y: 0,
                facing: North
            })
        );

        robot.facing = East;
        assert!(matches!(
            robot.step_forward(&mut grid, &mut NullPresenter),
            Err(SimError::InvalidMove { .. })
        ));
        assert_eq!(robot.position(), (0, 0));
    }

    #[test]
    fn walks_a_found_path_to_the_marker() {
        let mut grid = Grid::parse(
            "H...
             ....
             ....
             M...",
        )
        .unwrap();
        let result = find_nearest_marker(&grid, 0, 0).unwrap();
        assert_eq!(result.path(), &[South, South, South]);

        let mut presenter = RecordingPresenter::new();
        let mut robot = Robot::at_home(&grid, East);
        for &d in result.path() {
            robot.go_to(d, &mut grid, &mut presenter).unwrap();
        }

        assert_eq!(presenter.headings(), vec![South]);
        assert_eq!(robot.position(), (0, 3));
        assert!(robot.carrying);
        assert_eq!(grid.cell_at(0, 3).unwrap(), Cell::Collected);
    }

    #[test]
    fn retracing_the_path_returns_home() {
        let mut grid = Grid::parse(
            "H.#..
             ..#.M
             .....
             .#...
             .....",
        )
        .unwrap();
        let result = find_nearest_marker(&grid, 0, 0).unwrap();
        let path = result.path().to_vec();
        assert!(!path.is_empty());

        let mut robot = Robot::at_home(&grid, West);
        for &d in &path {
            robot.go_to(d, &mut grid, &mut NullPresenter).unwrap();
        }
        for &d in path.iter().rev() {
            robot.go_to(d.opposite(), &mut grid, &mut NullPresenter).unwrap();
        }

        assert_eq!(robot.position(), grid.home());
        // ends facing opposite to the first outbound step, not the initial heading
        assert_eq!(robot.facing, path[0].opposite());
        assert!(robot.drop_off());
        assert!(!robot.drop_off());
    }
}
