//! Run configuration: command line flags, `HOMERUN_*` environment variables
//! (a `.env` file is honoured) and the validation applied before any world
//! is created.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::error::{Result, SimError};
use crate::generator::{ScatterGenerator, TerrainGenerator, WorldGenerator, WorldLayout};
use crate::network::DEFAULT_PORT;
use crate::types::{DEFAULT_GRID_SIZE, Direction};

pub const DEFAULT_MARKER_COUNT: usize = 100;
pub const DEFAULT_OBSTACLE_COUNT: usize = 60;
pub const DEFAULT_STEP_DELAY_MS: u64 = 10;

/// How markers and obstacles are laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum GeneratorKind {
    /// Uniform random placement
    Scatter,
    /// Obstacles follow Perlin noise ridges
    Terrain,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "homerun", version)]
#[command(about = "A robot fetches every reachable marker back to its home cell")]
pub struct SimulationArgs {
    /// Side length of the square grid
    #[arg(long, env = "HOMERUN_GRID_SIZE", default_value_t = DEFAULT_GRID_SIZE)]
    pub size: usize,

    /// Number of markers to place
    #[arg(long, env = "HOMERUN_MARKERS", default_value_t = DEFAULT_MARKER_COUNT)]
    pub markers: usize,

    /// Number of obstacles to place
    #[arg(long, env = "HOMERUN_OBSTACLES", default_value_t = DEFAULT_OBSTACLE_COUNT)]
    pub obstacles: usize,

    /// Pause before each turn and each step, in milliseconds
    #[arg(long = "delay-ms", env = "HOMERUN_DELAY_MS", default_value_t = DEFAULT_STEP_DELAY_MS)]
    pub delay_ms: u64,

    /// Random seed, for reproducible worlds
    #[arg(long, env = "HOMERUN_SEED")]
    pub seed: Option<u64>,

    /// World generator
    #[arg(long, value_enum, env = "HOMERUN_GENERATOR", default_value_t = GeneratorKind::Scatter)]
    pub generator: GeneratorKind,

    /// TCP port of the simulation server
    #[arg(long, env = "HOMERUN_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Simulation server only: also draw the run in this terminal
    #[arg(long, env = "HOMERUN_LOCAL_VIEW")]
    pub local_view: bool,

    /// Home column
    pub home_x: Option<usize>,

    /// Home row
    pub home_y: Option<usize>,

    /// Initial heading: north, east, south or west
    pub direction: Option<String>,
}

impl SimulationArgs {
    /// Turns the raw arguments into a validated configuration.
    pub fn into_config(self) -> Result<SimulationConfig> {
        let (home, facing) = match (self.home_x, self.home_y, self.direction.as_deref()) {
            (None, None, None) => ((0, 0), Direction::East),
            (Some(x), Some(y), Some(token)) => ((x, y), token.parse()?),
            _ => {
                return Err(SimError::Configuration(
                    "home placement needs HOME_X HOME_Y DIRECTION together".into(),
                ));
            }
        };

        let config = SimulationConfig {
            layout: WorldLayout {
                size: self.size,
                home,
                marker_count: self.markers,
                obstacle_count: self.obstacles,
            },
            facing,
            step_delay: Duration::from_millis(self.delay_ms),
            seed: self.seed,
            generator: self.generator,
            port: self.port,
            local_view: self.local_view,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    pub layout: WorldLayout,
    /// Heading of the robot when the run starts
    pub facing: Direction,
    /// Presentation pause per turn and per step; zero when headless
    pub step_delay: Duration,
    pub seed: Option<u64>,
    pub generator: GeneratorKind,
    pub port: u16,
    /// Server draws the run locally in addition to broadcasting it
    pub local_view: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            layout: WorldLayout {
                size: DEFAULT_GRID_SIZE,
                home: (0, 0),
                marker_count: DEFAULT_MARKER_COUNT,
                obstacle_count: DEFAULT_OBSTACLE_COUNT,
            },
            facing: Direction::East,
            step_delay: Duration::from_millis(DEFAULT_STEP_DELAY_MS),
            seed: None,
            generator: GeneratorKind::Scatter,
            port: DEFAULT_PORT,
            local_view: false,
        }
    }
}

impl SimulationConfig {
    /// Loads `.env`, then parses the process arguments.
    pub fn from_cli() -> Result<Self> {
        dotenvy::dotenv().ok();
        SimulationArgs::parse().into_config()
    }

    pub fn validate(&self) -> Result<()> {
        self.layout.validate()
    }

    pub fn world_generator(&self) -> Box<dyn WorldGenerator + Send> {
        match self.generator {
            GeneratorKind::Scatter => Box::new(ScatterGenerator::new(self.seed)),
            GeneratorKind::Terrain => Box::new(TerrainGenerator::new(self.seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SimulationConfig> {
        let mut argv = vec!["homerun"];
        argv.extend_from_slice(args);
        SimulationArgs::try_parse_from(argv)
            .expect("arguments should parse")
            .into_config()
    }

    #[test]
    fn defaults_match_the_reference_setup() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.layout.size, 20);
        assert_eq!(config.layout.home, (0, 0));
        assert_eq!(config.layout.marker_count, 100);
        assert_eq!(config.layout.obstacle_count, 60);
        assert_eq!(config.facing, Direction::East);
        assert_eq!(config.step_delay, Duration::from_millis(10));
        assert!(!config.local_view);
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn local_view_is_a_flag() {
        assert!(parse(&["--local-view"]).unwrap().local_view);
    }

    #[test]
    fn positional_placement() {
        let config = parse(&["--size", "8", "--markers", "5", "--obstacles", "5", "3", "7", "south"])
            .unwrap();
        assert_eq!(config.layout.home, (3, 7));
        assert_eq!(config.facing, Direction::South);
        assert_eq!(config.layout.size, 8);
    }

    #[test]
    fn bad_placement_is_a_configuration_error() {
        assert!(matches!(parse(&["1", "1", "up"]), Err(SimError::Configuration(_))));
        assert!(matches!(parse(&["20", "0", "east"]), Err(SimError::Configuration(_))));
        assert!(matches!(parse(&["1", "1"]), Err(SimError::Configuration(_))));
    }

    #[test]
    fn overfull_grid_is_rejected() {
        assert!(matches!(
            parse(&["--size", "4", "--markers", "10", "--obstacles", "5"]),
            Err(SimError::Configuration(_))
        ));
        assert!(parse(&["--size", "4", "--markers", "10", "--obstacles", "4"]).is_ok());
    }

    #[test]
    fn generator_kind_is_selectable() {
        let config = parse(&["--generator", "terrain", "--seed", "5"]).unwrap();
        assert_eq!(config.generator, GeneratorKind::Terrain);
        assert_eq!(config.seed, Some(5));
        let grid = config.world_generator().generate(&config.layout).unwrap();
        assert_eq!(grid.count(crate::types::Cell::Marker), 100);
    }
}
