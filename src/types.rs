//! # Homerun Types Module
//!
//! Core data types shared by the grid, the path search, the robot and the
//! presenters.
//!
//! ## Key Components
//!
//! - **Cell**: content of one grid square
//! - **Direction**: compass heading, encoded as an ordinal so that rotation
//!   and reversal are plain modular arithmetic
//! - **DEFAULT_GRID_SIZE**: side length used when nothing else is configured
//!
//! All types are serializable so they can travel inside network events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// NOTE - Every possible content of a grid square
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Empty,     // NOTE - Free, traversable square
    Home,      // NOTE - Drop-off point, exactly one per grid
    Obstacle,  // NOTE - Impassable
    Marker,    // NOTE - Waiting to be picked up
    Collected, // NOTE - A marker used to be here
}

impl Cell {
    /// Character used by the ASCII layout format (`Grid::parse` / `Display`).
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Home => 'H',
            Cell::Obstacle => '#',
            Cell::Marker => 'M',
            Cell::Collected => 'o',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Cell::Empty),
            'H' => Some(Cell::Home),
            '#' => Some(Cell::Obstacle),
            'M' => Some(Cell::Marker),
            'o' => Some(Cell::Collected),
            _ => None,
        }
    }
}

/// Compass heading. The discriminants are the ordinals 0..3 used for
/// rotation arithmetic and are also the search exploration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// Exploration order of the breadth-first search.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// One quarter turn counter-clockwise.
    pub fn turned_left(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// One quarter turn clockwise.
    pub fn turned_right(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// (dx, dy) of a single step. Y grows downwards, so North is -1.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// Neighbour of (x, y) in this direction, or `None` when it would leave
    /// a square grid of side `size`.
    pub fn step(self, x: usize, y: usize, size: usize) -> Option<(usize, usize)> {
        let (dx, dy) = self.delta();
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < size && ny < size).then_some((nx, ny))
    }

    /// Arrow glyph used by the terminal renderers.
    pub fn arrow(self) -> char {
        match self {
            Direction::North => '▲',
            Direction::East => '▶',
            Direction::South => '▼',
            Direction::West => '◀',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        };
        f.pad(name)
    }
}

impl FromStr for Direction {
    type Err = SimError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token.trim().to_ascii_lowercase().as_str() {
            "north" | "n" => Ok(Direction::North),
            "east" | "e" => Ok(Direction::East),
            "south" | "s" => Ok(Direction::South),
            "west" | "w" => Ok(Direction::West),
            _ => Err(SimError::Configuration(format!(
                "invalid direction '{token}', expected north, east, south or west"
            ))),
        }
    }
}

/// NOTE - Side length of the square grid when not configured
pub const DEFAULT_GRID_SIZE: usize = 20;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_and_rotations_wrap_around() {
        assert_eq!(Direction::North.opposite(), Direction::South);
        assert_eq!(Direction::West.opposite(), Direction::East);
        assert_eq!(Direction::North.turned_left(), Direction::West);
        assert_eq!(Direction::West.turned_right(), Direction::North);
        for d in Direction::ALL {
            assert_eq!(d.opposite().opposite(), d);
            assert_eq!(d.turned_left().turned_right(), d);
        }
    }

    #[test]
    fn step_stays_inside_the_grid() {
        assert_eq!(Direction::North.step(0, 0, 4), None);
        assert_eq!(Direction::West.step(0, 2, 4), None);
        assert_eq!(Direction::East.step(3, 0, 4), None);
        assert_eq!(Direction::South.step(1, 3, 4), None);
        assert_eq!(Direction::South.step(1, 1, 4), Some((1, 2)));
        assert_eq!(Direction::East.step(1, 1, 4), Some((2, 1)));
    }

    #[test]
    fn parses_direction_tokens() {
        assert_eq!("east".parse::<Direction>().unwrap(), Direction::East);
        assert_eq!("NORTH".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!(" s ".parse::<Direction>().unwrap(), Direction::South);
        assert!(matches!(
            "up".parse::<Direction>(),
            Err(SimError::Configuration(_))
        ));
    }

    #[test]
    fn symbols_match_parser() {
        for cell in [Cell::Empty, Cell::Home, Cell::Obstacle, Cell::Marker, Cell::Collected] {
            assert_eq!(Cell::from_symbol(cell.symbol()), Some(cell));
        }
        assert_eq!(Cell::from_symbol('x'), None);
    }
}
