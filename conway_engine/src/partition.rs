// partition.rs - Row-range partition of the grid, one range per worker task

use std::ops::Range;

use crate::error::{ConfigError, Result, SimulationError};

/// Contiguous block of rows `[start, end)` computed by one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowRange {
    pub start: usize,                                  // First row (inclusive)
    pub end: usize,                                    // First row after the range
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Division of `[0, side)` into `tasks` disjoint ranges.
///
/// Every range holds `side / tasks` rows except the last, which absorbs the
/// remainder so its end is always exactly `side`. The partition does not
/// depend on the generation, so it is computed once per scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    side: usize,
    ranges: Vec<RowRange>,
}

impl Partition {
    pub fn new(side: usize, tasks: usize) -> Result<Self> {
        if side == 0 { return Err(ConfigError::ZeroSide.into()); }
        if tasks == 0 || tasks > side {
            return Err(ConfigError::Tasks { tasks, side }.into());
        }

        let span = side / tasks;
        let ranges = (0..tasks)
            .map(|i| {
                let end = if i + 1 == tasks { side } else { (i + 1) * span };
                RowRange::new(i * span, end)
            })
            .collect();

        let partition = Self { side, ranges };
        partition.check()?;
        Ok(partition)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn ranges(&self) -> &[RowRange] {
        &self.ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Verify the ranges cover `[0, side)` exactly once, in order.
    pub fn check(&self) -> Result<()> {
        check_cover(self.side, &self.ranges)
    }
}

/// Coverage check shared by the partition and the grid's commit path.
pub(crate) fn check_cover(side: usize, ranges: &[RowRange]) -> Result<()> {
    let mut next = 0;
    for range in ranges {
        if range.start != next {
            return Err(SimulationError::Partition(format!(
                "range {}..{} does not start at row {}",
                range.start, range.end, next
            )));
        }
        if range.is_empty() {
            return Err(SimulationError::Partition(format!(
                "empty range at row {}", range.start
            )));
        }
        next = range.end;
    }
    if next != side {
        return Err(SimulationError::Partition(format!(
            "ranges cover rows 0..{next} of {side}"
        )));
    }
    Ok(())
}
