// simulation.rs - Controller-facing surface over the grid, coordinator and pool

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::coordinator::{Coordinator, Delay, RunMode};
use crate::error::{Result, SimulationError};
use crate::grid::{Grid, Snapshot};
use crate::patterns::{self, Pattern};
use crate::scheduler::{GenerationScheduler, LoopExit};

/// A simulation run driven by an external controller (window, CLI, test).
///
/// All methods are blocking and must be called from outside any tokio
/// runtime. The worker pool is built on the first start and kept for the
/// lifetime of the value; parameters can only change before that.
pub struct Simulation {
    config: SimulationConfig,
    grid: Arc<Mutex<Grid>>,
    coordinator: Arc<Coordinator>,
    rejected_seed: Vec<(usize, usize)>,
    runtime: Option<Runtime>,
    scheduler: Option<Arc<GenerationScheduler>>,
    driver: Option<JoinHandle<Result<LoopExit>>>,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut grid = Grid::new(config.side);
        let rejected_seed = seed_grid(&mut grid, &config)?;
        let coordinator = Arc::new(Coordinator::new(config.effective_delay()));

        Ok(Self {
            config,
            grid: Arc::new(Mutex::new(grid)),
            coordinator,
            rejected_seed,
            runtime: None,
            scheduler: None,
            driver: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Seed cells dropped because they were outside the board.
    pub fn rejected_seed(&self) -> &[(usize, usize)] {
        &self.rejected_seed
    }

    pub fn mode(&self) -> RunMode {
        self.coordinator.mode()
    }

    pub fn generation(&self) -> u64 {
        self.grid.lock().generation()
    }

    pub fn active_workers(&self) -> usize {
        self.coordinator.active_workers()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.grid.lock().snapshot()
    }

    pub fn has_started(&self) -> bool {
        self.runtime.is_some()
    }

    // ------------------------------------------------------------------
    // Parameters (before the first start only)
    // ------------------------------------------------------------------

    pub fn set_workers(&mut self, workers: usize) -> Result<()> {
        self.update_config(SimulationConfig { workers, ..self.config.clone() })
    }

    pub fn set_tasks(&mut self, tasks: usize) -> Result<()> {
        self.update_config(SimulationConfig { tasks, ..self.config.clone() })
    }

    pub fn set_delay(&mut self, delay: Delay) -> Result<()> {
        self.update_config(SimulationConfig { delay: Some(delay), ..self.config.clone() })?;
        self.coordinator = Arc::new(Coordinator::new(delay));
        self.scheduler = None;
        Ok(())
    }

    /// Replace the board contents with the given live cells. Returns the
    /// cells that were outside the board.
    pub fn set_seed(&mut self, cells: Vec<(usize, usize)>) -> Result<Vec<(usize, usize)>> {
        self.update_config(SimulationConfig { seed: cells, glider: false, random: None, ..self.config.clone() })?;
        let mut grid = self.grid.lock();
        grid.clear()?;
        self.rejected_seed = seed_grid(&mut grid, &self.config)?;
        Ok(self.rejected_seed.clone())
    }

    fn update_config(&mut self, config: SimulationConfig) -> Result<()> {
        if self.has_started() { return Err(SimulationError::AlreadyStarted); }
        config.validate()?;
        self.config = config;
        self.scheduler = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Control operations
    // ------------------------------------------------------------------

    /// Begin the generation loop. Returns `false` if already running or paused.
    pub fn start(&mut self) -> Result<bool> {
        self.launch(None)
    }

    /// Begin a run that stops by itself after `count` more generations.
    pub fn start_for(&mut self, count: u64) -> Result<bool> {
        self.launch(Some(count))
    }

    pub fn pause(&self) -> bool {
        self.coordinator.pause()
    }

    pub fn resume(&self) -> bool {
        self.coordinator.resume()
    }

    /// Advance by exactly one generation, then pause. While running this
    /// simply pauses.
    pub fn step(&mut self) -> Result<()> {
        match self.coordinator.mode() {
            RunMode::Running => {
                self.coordinator.pause();
            }
            RunMode::Paused => {
                self.coordinator.request_step();
                self.coordinator.resume();
            }
            RunMode::Stopped => {
                self.join_driver()?;
                self.coordinator.request_step();
                self.launch(None)?;
            }
        }
        Ok(())
    }

    /// Stop the run and wait until the loop and every worker have exited.
    pub fn stop(&mut self) -> Result<()> {
        self.coordinator.stop();
        self.join_driver()?;
        Ok(())
    }

    /// Run exactly `count` generations from a stopped state and return the
    /// final generation number.
    pub fn run_generations(&mut self, count: u64) -> Result<u64> {
        if !self.launch(Some(count))? {
            return Err(SimulationError::Busy(self.coordinator.mode().label()));
        }
        self.join_driver()?;
        Ok(self.generation())
    }

    /// Block until the grid reaches `target` or `timeout` passes.
    pub fn wait_for_generation(&self, target: u64, timeout: Duration) -> bool {
        let Some(runtime) = &self.runtime else { return self.generation() >= target };
        let mut generations = self.grid.lock().subscribe();
        runtime.block_on(async {
            tokio::time::timeout(timeout, generations.wait_for(|generation| *generation >= target))
                .await
                .is_ok_and(|reached| reached.is_ok())
        })
    }

    // ------------------------------------------------------------------
    // Editing (only while stopped)
    // ------------------------------------------------------------------

    /// Flip one cell; rejected unless the simulation is stopped.
    pub fn toggle(&mut self, row: usize, col: usize) -> Result<bool> {
        let mode = self.coordinator.mode();
        if mode != RunMode::Stopped { return Err(SimulationError::Busy(mode.label())); }
        self.grid.lock().toggle(row, col)
    }

    /// Stop, then kill every cell.
    pub fn clear(&mut self) -> Result<()> {
        self.stop()?;
        self.grid.lock().clear()
    }

    pub fn apply_pattern(&mut self, pattern: &Pattern) -> Result<()> {
        self.stop()?;
        patterns::apply_pattern(&mut self.grid.lock(), pattern)
    }

    pub fn randomize(&mut self, seed: u64) -> Result<()> {
        self.stop()?;
        patterns::apply_random_pattern(&mut self.grid.lock(), seed)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn launch(&mut self, limit: Option<u64>) -> Result<bool> {
        if self.coordinator.mode() != RunMode::Stopped { return Ok(false); }
        self.join_driver()?;

        // The pool comes first: until it exists parameters may still change
        let runtime = match self.runtime.take() {
            Some(runtime) => runtime,
            None => build_pool(self.config.workers)?,
        };
        let handle = runtime.handle().clone();
        self.runtime = Some(runtime);
        let scheduler = self.scheduler()?;

        let coordinator = Arc::clone(&self.coordinator);
        coordinator.start();
        info!(generation = self.generation(), ?limit, "simulation started");
        self.driver = Some(handle.spawn(async move {
            let exit = scheduler.run_loop(limit).await;
            coordinator.stop();
            exit
        }));
        Ok(true)
    }

    /// The scheduler for the current parameters, built on first use.
    fn scheduler(&mut self) -> Result<Arc<GenerationScheduler>> {
        if let Some(scheduler) = &self.scheduler { return Ok(Arc::clone(scheduler)); }

        let scheduler = Arc::new(GenerationScheduler::configure(
            self.config.tasks,
            Arc::clone(&self.grid),
            Arc::clone(&self.coordinator),
        )?);
        self.scheduler = Some(Arc::clone(&scheduler));
        Ok(scheduler)
    }

    /// Reap the loop task, if any, and wait for all workers to unregister.
    fn join_driver(&mut self) -> Result<Option<LoopExit>> {
        let (Some(driver), Some(runtime)) = (self.driver.take(), self.runtime.as_ref()) else {
            return Ok(None);
        };
        let exit = runtime
            .block_on(driver)
            .map_err(|err| SimulationError::WorkerPanicked(err.to_string()))??;
        runtime.block_on(self.coordinator.wait_idle());
        Ok(Some(exit))
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.coordinator.stop();
        if let Some(runtime) = self.runtime.take() { runtime.shutdown_background(); }
    }
}

fn build_pool(workers: usize) -> Result<Runtime> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(workers)
        .thread_name("conway-worker")
        .enable_all()
        .build()?;
    info!(workers, "worker pool created");
    Ok(runtime)
}

/// Apply the configured seeds in order: random fill, glider, explicit cells.
fn seed_grid(grid: &mut Grid, config: &SimulationConfig) -> Result<Vec<(usize, usize)>> {
    if let Some(seed) = config.random { patterns::apply_random_pattern(grid, seed)?; }
    if config.glider { patterns::place(grid, &patterns::GLIDER, (0, 0))?; }

    let (cells, rejected) = config.split_seed();
    grid.seed(&cells)?;
    for (row, col) in &rejected {
        warn!(row, col, side = config.side, "seed cell outside the board, ignored");
    }
    Ok(rejected)
}
