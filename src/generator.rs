//! World generation: where home, obstacles and markers go before a run.
//!
//! Two generators are provided. [`ScatterGenerator`] drops markers and
//! obstacles uniformly at random. [`TerrainGenerator`] ranks the free cells
//! by Perlin noise and turns the highest ones into obstacles, which gives
//! connected walls instead of isolated blocks; markers are then scattered on
//! what is left.

use noise::{NoiseFn, Perlin};
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::debug;

use crate::error::{Result, SimError};
use crate::map::Grid;
use crate::types::Cell;

/// What a generator has to produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorldLayout {
    pub size: usize,
    pub home: (usize, usize),
    pub marker_count: usize,
    pub obstacle_count: usize,
}

impl WorldLayout {
    /// Checks the home position and that markers and obstacles leave at
    /// least one free cell next to home.
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(SimError::Configuration("grid size must be at least 1".into()));
        }
        let (x, y) = self.home;
        if x >= self.size || y >= self.size {
            return Err(SimError::Configuration(format!(
                "home ({x}, {y}) must lie within 0..{}",
                self.size
            )));
        }
        let capacity = self.size * self.size;
        let requested = self.marker_count + self.obstacle_count;
        if requested + 1 >= capacity {
            return Err(SimError::Configuration(format!(
                "{} markers and {} obstacles do not fit a {}x{} grid (at most {} together)",
                self.marker_count,
                self.obstacle_count,
                self.size,
                self.size,
                capacity.saturating_sub(2)
            )));
        }
        Ok(())
    }
}

pub trait WorldGenerator {
    fn generate(&mut self, layout: &WorldLayout) -> Result<Grid>;
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn free_cells(grid: &Grid) -> Vec<(usize, usize)> {
    grid.positions_of(Cell::Empty).collect()
}

/// Uniform random placement: markers first, then obstacles, each on a cell
/// that is still empty.
#[derive(Debug)]
pub struct ScatterGenerator {
    rng: StdRng,
}

impl ScatterGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seeded_rng(seed),
        }
    }
}

impl WorldGenerator for ScatterGenerator {
    fn generate(&mut self, layout: &WorldLayout) -> Result<Grid> {
        layout.validate()?;
        let mut grid = Grid::new(layout.size, layout.home.0, layout.home.1)?;

        let mut free = free_cells(&grid);
        free.shuffle(&mut self.rng);
        let (markers, rest) = free.split_at(layout.marker_count);
        for &(x, y) in markers {
            grid.set_cell(x, y, Cell::Marker)?;
        }
        for &(x, y) in &rest[..layout.obstacle_count] {
            grid.set_cell(x, y, Cell::Obstacle)?;
        }

        debug!(size = layout.size, "scattered world generated");
        Ok(grid)
    }
}

/// Noise-shaped placement: obstacles on the highest-noise cells, markers
/// uniformly on the remaining free cells.
#[derive(Debug)]
pub struct TerrainGenerator {
    rng: StdRng,
    /// Noise frequency across the whole grid.
    scale: f64,
}

impl TerrainGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seeded_rng(seed),
            scale: 4.0,
        }
    }
}

impl WorldGenerator for TerrainGenerator {
    fn generate(&mut self, layout: &WorldLayout) -> Result<Grid> {
        layout.validate()?;
        let mut grid = Grid::new(layout.size, layout.home.0, layout.home.1)?;

        let perlin = Perlin::new(self.rng.r#gen());
        let size = layout.size as f64;
        let mut ranked: Vec<((usize, usize), f64)> = free_cells(&grid)
            .into_iter()
            .map(|(x, y)| {
                let nx = x as f64 / size;
                let ny = y as f64 / size;
                ((x, y), perlin.get([nx * self.scale, ny * self.scale]))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        for &((x, y), _) in &ranked[..layout.obstacle_count] {
            grid.set_cell(x, y, Cell::Obstacle)?;
        }

        let mut free = free_cells(&grid);
        free.shuffle(&mut self.rng);
        for &(x, y) in &free[..layout.marker_count] {
            grid.set_cell(x, y, Cell::Marker)?;
        }

        debug!(size = layout.size, "terrain world generated");
        Ok(grid)
    }
}
