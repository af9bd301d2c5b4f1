// scheduler.rs - Generation loop: partition, dispatch, barrier, swap

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::coordinator::Coordinator;
use crate::error::{Result, SimulationError};
use crate::grid::{Grid, Lease};
use crate::partition::Partition;
use crate::worker::{TaskStatus, WorkerTask};

/// Result of one dispatched generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Every task finished; the buffers were swapped and this is the new
    /// generation number.
    Completed(u64),
    /// At least one task observed `Stopped`; no swap took place.
    Cancelled,
}

/// Why `run_loop` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Stopped,
    Limit,
}

/// Drives generations over a shared grid.
///
/// Each generation fans out one task per row range onto the current tokio
/// runtime and joins all of them before committing. The join is the barrier:
/// no swap happens until every task has handed its rows back, and no task of
/// the next generation is spawned before the swap.
#[derive(Debug)]
pub struct GenerationScheduler {
    grid: Arc<Mutex<Grid>>,
    coordinator: Arc<Coordinator>,
    partition: Partition,
}

impl GenerationScheduler {
    pub fn configure(tasks: usize, grid: Arc<Mutex<Grid>>, coordinator: Arc<Coordinator>) -> Result<Self> {
        let side = grid.lock().side();
        let partition = Partition::new(side, tasks)?;

        debug!(side, tasks, "row partition: {:?}", partition.ranges());
        Ok(Self { grid, coordinator, partition })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    /// Receiver that sees the generation number after every swap.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.grid.lock().subscribe()
    }

    /// Run one generation; must be called from within a tokio runtime.
    pub async fn run_generation(&self) -> Result<GenerationOutcome> {
        let started = Instant::now();
        let Lease { current, chunks } = self.grid.lock().lease(&self.partition)?;

        let mut handles = Vec::with_capacity(chunks.len());
        for (range, rows) in chunks {
            let task = WorkerTask::new(range, Arc::clone(&current), rows, Arc::clone(&self.coordinator));
            handles.push(tokio::spawn(task.run()));
        }
        drop(current);

        // Barrier: wait for every task, even after one has failed
        let mut outcomes = Vec::with_capacity(handles.len());
        let mut failure = None;
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err)    => failure = Some(err.to_string()),
            }
        }

        let mut grid = self.grid.lock();
        if let Some(reason) = failure {
            grid.abandon();
            error!(%reason, "worker task failed, generation discarded");
            return Err(SimulationError::WorkerPanicked(reason));
        }

        let completed = outcomes.iter().all(|outcome| outcome.status == TaskStatus::Completed);
        let chunks = outcomes.into_iter().map(|outcome| (outcome.range, outcome.rows)).collect();
        grid.commit(chunks, completed)?;

        if !completed {
            debug!(generation = grid.generation(), "generation cancelled, buffers not swapped");
            return Ok(GenerationOutcome::Cancelled);
        }

        let generation = grid.generation();
        drop(grid);
        debug!(generation, elapsed = ?started.elapsed(), "generation complete");
        Ok(GenerationOutcome::Completed(generation))
    }

    /// Run exactly one generation outside the loop, then leave the
    /// coordinator paused. Not to be mixed with a concurrent `run_loop`.
    pub async fn single_step(&self) -> Result<GenerationOutcome> {
        if !self.coordinator.resume() { self.coordinator.start(); }

        let outcome = self.run_generation().await?;
        if let GenerationOutcome::Completed(generation) = outcome {
            self.coordinator.pause();
            debug!(generation, "single step complete");
        }
        Ok(outcome)
    }

    /// Run generations until the coordinator stops, or until `limit`
    /// generations have completed.
    ///
    /// A pending single-step request pauses the coordinator after the next
    /// completed generation; the loop then waits at its own checkpoint.
    pub async fn run_loop(&self, limit: Option<u64>) -> Result<LoopExit> {
        let _registration = self.coordinator.register();
        let mut checkpoint = self.coordinator.subscribe();
        let mut completed = 0;
        info!(tasks = self.partition.len(), ?limit, "generation loop started");

        loop {
            if limit.is_some_and(|limit| completed >= limit) {
                info!(completed, "generation limit reached");
                return Ok(LoopExit::Limit);
            }
            if checkpoint.hesitate().await.is_err() { break; }

            match self.run_generation().await? {
                GenerationOutcome::Completed(_) => {
                    completed += 1;
                    if self.coordinator.take_step() { self.coordinator.pause(); }
                }
                GenerationOutcome::Cancelled => break,
            }
        }

        info!(completed, "generation loop stopped");
        Ok(LoopExit::Stopped)
    }
}
