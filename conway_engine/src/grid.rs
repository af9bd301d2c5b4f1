// grid.rs - Double-buffered toroidal grid of two-state cells

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::mem;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{Result, SimulationError};
use crate::partition::{self, Partition, RowRange};

pub type Cell = u8;
pub const DEAD: Cell = 0;
pub const ALIVE: Cell = 1;

pub type TRow = Box<[Cell]>;

/// One `side × side` copy of the board, stored row by row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Buffer {
    rows: Vec<TRow>,
}

impl Buffer {
    pub fn dead(side: usize) -> Self {
        Self { rows: (0..side).map(|_| dead_row(side)).collect() }
    }

    pub fn side(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.rows[row][col]
    }

    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.rows[row][col] == ALIVE
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        &self.rows[row]
    }

    /// Live cells among the eight neighbours, wrapping at every edge.
    pub fn live_neighbors(&self, row: usize, col: usize) -> u8 {
        let n = self.side();
        let (up, down) = ((row + n - 1) % n, (row + 1) % n);
        let (left, right) = ((col + n - 1) % n, (col + 1) % n);

        self.rows[up][left] + self.rows[up][col] + self.rows[up][right]
            + self.rows[row][left] + self.rows[row][right]
            + self.rows[down][left] + self.rows[down][col] + self.rows[down][right]
    }

    /// Next state of one cell under the standard rule.
    pub fn next_state(&self, row: usize, col: usize) -> Cell {
        match self.live_neighbors(row, col) {
            3 => ALIVE,                                // Birth or survival
            2 => self.rows[row][col],                  // Unchanged
            _ => DEAD,                                 // Under- or overpopulation
        }
    }

    pub fn population(&self) -> usize {
        self.rows.iter().map(|row| row.iter().filter(|&&c| c == ALIVE).count()).sum()
    }

    /// Coordinates of live cells in row-major order.
    pub fn live_cells(&self) -> Vec<(usize, usize)> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(r, row)| {
                row.iter().enumerate().filter(|(_, c)| **c == ALIVE).map(move |(c, _)| (r, c))
            })
            .collect()
    }

    /// Content hash, used for cycle detection.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.rows.hash(&mut hasher);
        hasher.finish()
    }
}

fn dead_row(side: usize) -> TRow {
    vec![DEAD; side].into_boxed_slice()
}

/// Read-only view of the current buffer taken after a completed swap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub cells: Arc<Buffer>,
}

impl Snapshot {
    pub fn side(&self) -> usize {
        self.cells.side()
    }

    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.cells.is_alive(row, col)
    }

    pub fn population(&self) -> usize {
        self.cells.population()
    }

    pub fn fingerprint(&self) -> u64 {
        self.cells.fingerprint()
    }
}

/// Material for one generation: the shared current buffer and the scratch
/// rows split by range. Each task owns the rows it writes.
#[derive(Debug)]
pub struct Lease {
    pub current: Arc<Buffer>,
    pub chunks: Vec<(RowRange, Vec<TRow>)>,
}

/// The board: two indexed buffers and the index of the current one.
///
/// Workers never touch the grid directly. The scheduler leases the buffers
/// for a generation and commits the written scratch rows afterwards; the
/// active index only flips inside `commit`.
#[derive(Debug)]
pub struct Grid {
    side: usize,
    buffers: [Arc<Buffer>; 2],
    active: usize,
    generation: u64,
    generations: watch::Sender<u64>,
    in_flight: bool,
}

impl Grid {
    pub fn new(side: usize) -> Self {
        let (generations, _) = watch::channel(0);
        Self {
            side,
            buffers: [Arc::new(Buffer::dead(side)), Arc::new(Buffer::dead(side))],
            active: 0,
            generation: 0,
            generations,
            in_flight: false,
        }
    }

    /// Receiver that sees the generation counter after every swap or reset.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generations.subscribe()
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn current(&self) -> &Buffer {
        &self.buffers[self.active]
    }

    pub fn is_alive(&self, row: usize, col: usize) -> bool {
        self.current().is_alive(row, col)
    }

    pub fn population(&self) -> usize {
        self.current().population()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            generation: self.generation,
            cells: Arc::clone(&self.buffers[self.active]),
        }
    }

    /// Hand out the buffers for one generation.
    pub fn lease(&mut self, partition: &Partition) -> Result<Lease> {
        if self.in_flight { return Err(SimulationError::Busy("in flight")); }
        if partition.side() != self.side {
            return Err(SimulationError::Partition(format!(
                "partition for side {} used on grid of side {}",
                partition.side(), self.side
            )));
        }

        let current = Arc::clone(&self.buffers[self.active]);
        let scratch = Arc::make_mut(&mut self.buffers[1 - self.active]);
        let mut rows = mem::take(&mut scratch.rows).into_iter();
        let chunks = partition
            .ranges()
            .iter()
            .map(|range| (*range, rows.by_ref().take(range.len()).collect()))
            .collect();

        self.in_flight = true;
        Ok(Lease { current, chunks })
    }

    /// Return the scratch rows; flip buffers and count the generation only
    /// when `swap` is set.
    pub fn commit(&mut self, mut chunks: Vec<(RowRange, Vec<TRow>)>, swap: bool) -> Result<()> {
        chunks.sort_by_key(|(range, _)| range.start);
        let ranges: Vec<RowRange> = chunks.iter().map(|(range, _)| *range).collect();
        if let Err(err) = partition::check_cover(self.side, &ranges) {
            self.abandon();
            return Err(err);
        }

        let mut rows = Vec::with_capacity(self.side);
        for (range, chunk) in chunks {
            if chunk.len() != range.len() {
                self.abandon();
                return Err(SimulationError::Partition(format!(
                    "range {}..{} returned {} rows", range.start, range.end, chunk.len()
                )));
            }
            rows.extend(chunk);
        }

        Arc::make_mut(&mut self.buffers[1 - self.active]).rows = rows;
        if swap {
            self.active = 1 - self.active;
            self.generation += 1;
            self.generations.send_replace(self.generation);
        }
        self.in_flight = false;
        Ok(())
    }

    /// Drop an outstanding lease whose rows were lost; the scratch buffer is
    /// rebuilt dead and the current buffer is left untouched.
    pub fn abandon(&mut self) {
        self.buffers[1 - self.active] = Arc::new(Buffer::dead(self.side));
        self.in_flight = false;
    }

    pub fn toggle(&mut self, row: usize, col: usize) -> Result<bool> {
        self.check_editable(row, col)?;
        let cell = &mut self.current_mut().rows[row][col];
        *cell = ALIVE - *cell;
        Ok(*cell == ALIVE)
    }

    pub fn set(&mut self, row: usize, col: usize, alive: bool) -> Result<()> {
        self.check_editable(row, col)?;
        self.current_mut().rows[row][col] = if alive { ALIVE } else { DEAD };
        Ok(())
    }

    /// All cells dead, generation counter back to 0.
    pub fn clear(&mut self) -> Result<()> {
        if self.in_flight { return Err(SimulationError::Busy("in flight")); }
        self.buffers = [Arc::new(Buffer::dead(self.side)), Arc::new(Buffer::dead(self.side))];
        self.active = 0;
        self.reset_generation();
        Ok(())
    }

    /// Mark the given cells alive, returning the ones outside the board.
    pub fn seed(&mut self, cells: &[(usize, usize)]) -> Result<Vec<(usize, usize)>> {
        let mut rejected = Vec::new();
        for &(row, col) in cells {
            match self.set(row, col, true) {
                Ok(()) => {}
                Err(SimulationError::OutOfBounds { .. }) => rejected.push((row, col)),
                Err(err) => return Err(err),
            }
        }
        self.reset_generation();
        Ok(rejected)
    }

    fn reset_generation(&mut self) {
        self.generation = 0;
        self.generations.send_replace(0);
    }

    fn check_editable(&self, row: usize, col: usize) -> Result<()> {
        if self.in_flight { return Err(SimulationError::Busy("in flight")); }
        if row >= self.side || col >= self.side {
            return Err(SimulationError::OutOfBounds { row, col, side: self.side });
        }
        Ok(())
    }

    fn current_mut(&mut self) -> &mut Buffer {
        Arc::make_mut(&mut self.buffers[self.active])
    }
}

/// Run one generation on the calling thread, no coordination involved.
pub fn step_sequential(current: &Buffer) -> Buffer {
    let side = current.side();
    let rows = (0..side)
        .map(|r| (0..side).map(|c| current.next_state(r, c)).collect::<Vec<_>>().into_boxed_slice())
        .collect();
    Buffer { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(side: usize, cells: &[(usize, usize)]) -> Grid {
        let mut grid = Grid::new(side);
        assert!(grid.seed(cells).unwrap().is_empty());
        grid
    }

    #[test]
    fn neighbors_wrap_around_edges() {
        let grid = seeded(5, &[(4, 4), (0, 4), (4, 0)]);
        assert_eq!(grid.current().live_neighbors(0, 0), 3);
        assert_eq!(grid.current().next_state(0, 0), ALIVE);
    }

    #[test]
    fn rule_matches_neighbor_counts() {
        // Blinker: centre survives with 2, ends die with 1, sides are born with 3
        let grid = seeded(5, &[(2, 1), (2, 2), (2, 3)]);
        let buffer = grid.current();
        assert_eq!(buffer.next_state(2, 2), ALIVE);
        assert_eq!(buffer.next_state(2, 1), DEAD);
        assert_eq!(buffer.next_state(1, 2), ALIVE);
        assert_eq!(buffer.next_state(3, 2), ALIVE);
        assert_eq!(buffer.next_state(0, 0), DEAD);
    }

    #[test]
    fn dead_grid_is_a_fixed_point() {
        let dead = Buffer::dead(9);
        assert_eq!(step_sequential(&dead), dead);
    }

    #[test]
    fn commit_without_swap_keeps_current() {
        let mut grid = seeded(6, &[(1, 1), (1, 2), (2, 1), (2, 2)]);
        let before = grid.snapshot();
        let partition = Partition::new(6, 2).unwrap();

        let lease = grid.lease(&partition).unwrap();
        assert!(grid.is_in_flight());
        assert!(matches!(grid.toggle(0, 0), Err(SimulationError::Busy(_))));

        grid.commit(lease.chunks, false).unwrap();
        assert!(!grid.is_in_flight());
        assert_eq!(grid.generation(), 0);
        assert_eq!(*grid.snapshot().cells, *before.cells);
    }

    #[test]
    fn commit_with_swap_flips_buffers() {
        let mut grid = seeded(6, &[(2, 1), (2, 2), (2, 3)]);
        let expected = step_sequential(grid.current());
        let partition = Partition::new(6, 3).unwrap();

        let Lease { current, chunks } = grid.lease(&partition).unwrap();
        let chunks = chunks
            .into_iter()
            .map(|(range, mut rows)| {
                for (offset, row) in rows.iter_mut().enumerate() {
                    for col in 0..row.len() {
                        row[col] = current.next_state(range.start + offset, col);
                    }
                }
                (range, rows)
            })
            .collect();
        drop(current);

        grid.commit(chunks, true).unwrap();
        assert_eq!(grid.generation(), 1);
        assert_eq!(*grid.current(), expected);
    }

    #[test]
    fn commit_rejects_missing_chunks() {
        let mut grid = Grid::new(6);
        let partition = Partition::new(6, 3).unwrap();
        let mut lease = grid.lease(&partition).unwrap();
        lease.chunks.pop();

        assert!(matches!(grid.commit(lease.chunks, true), Err(SimulationError::Partition(_))));
        assert!(!grid.is_in_flight());
        assert_eq!(grid.generation(), 0);
    }

    #[test]
    fn abandoned_lease_keeps_current_and_frees_the_grid() {
        let mut grid = seeded(6, &[(2, 1), (2, 2), (2, 3)]);
        let before = grid.snapshot();
        let partition = Partition::new(6, 2).unwrap();

        let lease = grid.lease(&partition).unwrap();
        drop(lease);
        grid.abandon();

        assert!(!grid.is_in_flight());
        assert_eq!(grid.generation(), 0);
        assert_eq!(*grid.current(), *before.cells);

        let lease = grid.lease(&partition).unwrap();
        assert!(lease.chunks.iter().all(|(range, rows)| rows.len() == range.len()));
        grid.commit(lease.chunks, true).unwrap();
        assert_eq!(grid.generation(), 1);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_edits() {
        let mut grid = seeded(4, &[(0, 0)]);
        let snapshot = grid.snapshot();
        grid.toggle(0, 0).unwrap();
        grid.toggle(3, 3).unwrap();

        assert!(snapshot.is_alive(0, 0));
        assert!(!snapshot.is_alive(3, 3));
        assert_eq!(grid.current().live_cells(), vec![(3, 3)]);
    }

    #[test]
    fn seed_reports_out_of_range_cells() {
        let mut grid = Grid::new(4);
        let rejected = grid.seed(&[(0, 1), (4, 0), (1, 9), (3, 3)]).unwrap();
        assert_eq!(rejected, vec![(4, 0), (1, 9)]);
        assert_eq!(grid.population(), 2);
    }

    #[test]
    fn clear_resets_cells_and_generation() {
        let mut grid = seeded(5, &[(2, 1), (2, 2), (2, 3)]);
        let partition = Partition::new(5, 1).unwrap();
        let lease = grid.lease(&partition).unwrap();
        grid.commit(lease.chunks, true).unwrap();
        assert_eq!(grid.generation(), 1);

        grid.clear().unwrap();
        assert_eq!(grid.generation(), 0);
        assert_eq!(grid.population(), 0);
    }
}
