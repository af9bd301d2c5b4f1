// headless.rs - Windowless driver: runs the simulation and logs progress

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use conway_engine::{RunMode, Simulation};
use tracing::info;

use crate::history::CycleDetector;

const REPORT_EVERY: u64 = 10;
const POLL: Duration = Duration::from_millis(250);

/// How a headless run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub generation: u64,
    pub reports: u64,               // Timestamp lines logged
    pub cycle_at: Option<u64>,      // Generation at which a repeat stopped the run
}

/// Run `generations` more generations (forever when `None`), stopping
/// early on a repeating board when `stop_on_cycle` is set.
pub fn run(mut sim: Simulation, generations: Option<u64>, stop_on_cycle: bool) -> anyhow::Result<Summary> {
    let started = Instant::now();
    info!(
        side = sim.config().side,
        workers = sim.config().workers,
        tasks = sim.config().tasks,
        delay = ?sim.config().effective_delay(),
        ?generations,
        "headless run"
    );

    let summary = watch(&mut sim, generations, stop_on_cycle)?;

    let elapsed = started.elapsed();
    info!(
        generation = summary.generation,
        elapsed_ms = elapsed.as_millis() as u64,
        per_generation_us = (elapsed.as_micros() as u64).checked_div(summary.generation).unwrap_or(0),
        population = sim.snapshot().population(),
        reports = summary.reports,
        cycle_at = ?summary.cycle_at,
        "headless run finished"
    );
    Ok(summary)
}

fn watch(sim: &mut Simulation, limit: Option<u64>, stop_on_cycle: bool) -> anyhow::Result<Summary> {
    let mut history = CycleDetector::default();
    let first = sim.generation();
    let target = limit.map(|count| first + count);
    let mut reported = first / REPORT_EVERY;
    let mut reports = 0;
    let mut cycle_at = None;
    let mut next = first + 1;

    match limit {
        Some(count) => sim.start_for(count)?,
        None => sim.start()?,
    };

    while target.is_none_or(|target| next <= target) {
        if !sim.wait_for_generation(next, POLL) {
            if sim.mode() == RunMode::Stopped { break; }
            continue;
        }

        let snapshot = sim.snapshot();
        while reported < snapshot.generation / REPORT_EVERY {
            reported += 1;
            reports += 1;
            info!(generation = reported * REPORT_EVERY, timestamp_ms = unix_millis(), "generation done");
        }
        if stop_on_cycle && history.check_for_cycle(snapshot.fingerprint()) {
            info!(generation = snapshot.generation, "board repeats a recent state, stopping");
            cycle_at = Some(snapshot.generation);
            break;
        }
        next = snapshot.generation + 1;
    }

    sim.stop()?;
    Ok(Summary { generation: sim.generation(), reports, cycle_at })
}

fn unix_millis() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conway_engine::{Delay, SimulationConfig};

    fn blinker(delay: Delay) -> Simulation {
        Simulation::new(SimulationConfig {
            side: 8,
            workers: 2,
            tasks: 2,
            delay: Some(delay),
            seed: vec![(3, 2), (3, 3), (3, 4)],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn batch_run_reports_every_ten_generations() {
        let summary = run(blinker(Delay::None), Some(25), false).unwrap();
        assert_eq!(summary, Summary { generation: 25, reports: 2, cycle_at: None });
    }

    #[test]
    fn batch_run_honours_stop_on_cycle() {
        let summary = run(blinker(Delay::Sleep(Duration::from_micros(200))), Some(100), true).unwrap();

        let cycle_at = summary.cycle_at.expect("blinker repeats with period 2");
        assert!(cycle_at < 100, "cycle at {cycle_at}");
        assert!(summary.generation < 100);
    }

    #[test]
    fn batches_continue_from_the_current_generation() {
        let mut sim = blinker(Delay::None);
        assert_eq!(sim.run_generations(5).unwrap(), 5);

        let summary = run(sim, Some(10), false).unwrap();
        assert_eq!(summary.generation, 15);
        assert_eq!(summary.reports, 1);
    }
}
