// worker.rs - Row-range task: computes the next state of its rows

use std::sync::Arc;

use crate::coordinator::{Cancelled, Checkpoint, Coordinator};
use crate::grid::{Buffer, TRow};
use crate::partition::RowRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Completed,
    Cancelled,
}

/// What a task hands back at the barrier. The rows are returned whether or
/// not the range was finished, so the scratch buffer is never lost.
#[derive(Debug)]
pub struct TaskOutcome {
    pub range: RowRange,
    pub rows: Vec<TRow>,
    pub status: TaskStatus,
}

/// One generation's work for one row range.
#[derive(Debug)]
pub struct WorkerTask {
    range: RowRange,
    current: Arc<Buffer>,
    rows: Vec<TRow>,
    coordinator: Arc<Coordinator>,
}

impl WorkerTask {
    pub fn new(range: RowRange, current: Arc<Buffer>, rows: Vec<TRow>, coordinator: Arc<Coordinator>) -> Self {
        Self { range, current, rows, coordinator }
    }

    pub async fn run(self) -> TaskOutcome {
        let WorkerTask { range, current, mut rows, coordinator } = self;
        let _registration = coordinator.register();

        let status = match compute_rows(range, &current, &mut rows, coordinator.subscribe()).await {
            Ok(())         => TaskStatus::Completed,
            Err(Cancelled) => TaskStatus::Cancelled,
        };
        TaskOutcome { range, rows, status }
    }
}

/// Fill `rows` (the scratch rows for `range`) from `current`, with one
/// checkpoint before every cell.
pub async fn compute_rows(
    range: RowRange,
    current: &Buffer,
    rows: &mut [TRow],
    mut checkpoint: Checkpoint,
) -> Result<(), Cancelled> {
    for (row_index, row) in range.rows().zip(rows.iter_mut()) {
        for col in 0..row.len() {
            checkpoint.hesitate().await?;              // Pause, stop and throttle point
            row[col] = current.next_state(row_index, col);
        }
    }
    Ok(())
}
