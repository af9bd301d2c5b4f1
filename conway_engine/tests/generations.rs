//! Generation results: the parallel schedule must match a sequential run.

use conway_engine::grid::step_sequential;
use conway_engine::{Buffer, Delay, Simulation, SimulationConfig};

fn config(side: usize, workers: usize, tasks: usize) -> SimulationConfig {
    SimulationConfig { side, workers, tasks, delay: Some(Delay::None), ..Default::default() }
}

fn sequential(start: &Buffer, generations: u64) -> Buffer {
    let mut buffer = start.clone();
    for _ in 0..generations { buffer = step_sequential(&buffer); }
    buffer
}

#[test]
fn glider_returns_translated_after_four_generations() {
    for (side, tasks) in [(5, 1), (8, 3), (10, 10), (13, 4)] {
        let mut sim = Simulation::new(SimulationConfig { glider: true, ..config(side, 2, tasks) }).unwrap();
        let start = sim.snapshot().cells.live_cells();

        assert_eq!(sim.run_generations(4).unwrap(), 4);

        let mut expected: Vec<_> = start.iter().map(|&(r, c)| ((r + 1) % side, (c + 1) % side)).collect();
        expected.sort();
        let mut live = sim.snapshot().cells.live_cells();
        live.sort();
        assert_eq!(live, expected, "side {side}, tasks {tasks}");
    }
}

#[test]
fn parallel_matches_sequential_for_any_task_count() {
    let side = 24;
    let generations = 6;

    for tasks in [1, 2, 3, 4, 5, 6, 7, 8, 10, 12, 23, 24] {
        let mut sim = Simulation::new(SimulationConfig { random: Some(7), ..config(side, 3, tasks) }).unwrap();
        let expected = sequential(&sim.snapshot().cells, generations);

        sim.run_generations(generations).unwrap();
        assert_eq!(*sim.snapshot().cells, expected, "tasks {tasks}");
    }
}

#[test]
fn single_worker_single_task_is_sequential() {
    let mut sim = Simulation::new(SimulationConfig { random: Some(99), ..config(15, 1, 1) }).unwrap();
    let expected = sequential(&sim.snapshot().cells, 9);

    assert_eq!(sim.run_generations(9).unwrap(), 9);
    assert_eq!(*sim.snapshot().cells, expected);
}

#[test]
fn dead_grid_stays_dead() {
    let mut sim = Simulation::new(config(12, 2, 5)).unwrap();
    sim.run_generations(3).unwrap();

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.generation, 3);
    assert_eq!(snapshot.population(), 0);
}

#[test]
fn batches_continue_from_the_previous_generation() {
    let mut sim = Simulation::new(SimulationConfig { random: Some(3), ..config(16, 2, 4) }).unwrap();
    let expected = sequential(&sim.snapshot().cells, 5);

    assert_eq!(sim.run_generations(2).unwrap(), 2);
    assert_eq!(sim.run_generations(3).unwrap(), 5);
    assert_eq!(*sim.snapshot().cells, expected);
}
