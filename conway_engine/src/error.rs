// error.rs - Error types for the coordination engine

use std::path::PathBuf;

use thiserror::Error;

/// Rejected configuration values, reported before anything starts running.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("grid side length must be at least 1")]
    ZeroSide,

    #[error("invalid number of worker threads: {0}")]
    Workers(usize),

    #[error("invalid number of tasks: {tasks} (must be in 1..={side})")]
    Tasks { tasks: usize, side: usize },

    #[error("invalid delay: {0}")]
    Delay(String),

    #[error("cannot read configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors surfaced by the controller-facing simulation surface.
#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("parameters can only be changed before the first start")]
    AlreadyStarted,

    #[error("grid cannot be edited while the simulation is {0}")]
    Busy(&'static str),

    #[error("cell ({row}, {col}) is outside a grid of side {side}")]
    OutOfBounds { row: usize, col: usize, side: usize },

    #[error("worker task failed: {0}")]
    WorkerPanicked(String),

    #[error("row partition invariant violated: {0}")]
    Partition(String),

    #[error("cannot build worker pool: {0}")]
    Pool(#[from] std::io::Error),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, SimulationError>;
