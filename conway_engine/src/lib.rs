//! Concurrency coordination engine for Conway's Game of Life on a torus.
//!
//! A [`Simulation`] owns a double-buffered [`Grid`], a [`Coordinator`] that
//! every worker consults before each cell update, and a fixed-size tokio
//! worker pool. Each generation the [`GenerationScheduler`] splits the rows
//! into ranges, runs one [`WorkerTask`] per range, joins them all, and only
//! then swaps the buffers.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod partition;
pub mod patterns;
pub mod scheduler;
pub mod simulation;
pub mod worker;

pub use config::SimulationConfig;
pub use coordinator::{Cancelled, Checkpoint, Coordinator, Delay, Registration, RunMode};
pub use error::{ConfigError, Result, SimulationError};
pub use grid::{ALIVE, Buffer, Cell, DEAD, Grid, Snapshot};
pub use partition::{Partition, RowRange};
pub use scheduler::{GenerationOutcome, GenerationScheduler, LoopExit};
pub use simulation::Simulation;
pub use worker::{TaskOutcome, TaskStatus, WorkerTask};
