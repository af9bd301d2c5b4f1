// main.rs - Conway's Game of Life driven by a pool of cooperating workers
// Window front end by default, headless driver with --headless

use clap::Parser;
use eframe::egui;
use egui::Color32;
use tracing::info;

mod cli;
mod headless;
mod history;
mod ui;

use cli::Cli;
use conway_engine::{Simulation, Snapshot};
use history::CycleDetector;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = cli.to_config()?;
    let sim = Simulation::new(config)?;

    if cli.headless {
        headless::run(sim, cli.generations, cli.stop_on_cycle)?;
        return Ok(());
    }

    info!("opening window");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([840.0, 980.0]),
        ..Default::default()
    };

    let stop_on_cycle = cli.stop_on_cycle;
    eframe::run_native(
        "Conway's Game of Life",
        options,
        Box::new(move |_cc| Box::new(GameOfLife::new(sim, stop_on_cycle))),
    )
    .map_err(|err| anyhow::anyhow!("window failed: {err}"))
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_names(true)
        .init();
}

/// Window state around a running simulation
pub struct GameOfLife {
    sim: Simulation,

    pub snapshot: Snapshot,        // Last post-swap view, used for drawing
    pub live_color: Color32,
    pub dead_color: Color32,
    pub selected_pattern: usize,
    pub random_seed: u64,
    pub stop_on_cycle: bool,
    pub status: Option<String>,    // Last error or notice, shown under the controls

    history: CycleDetector,
}

impl GameOfLife {
    pub fn new(sim: Simulation, stop_on_cycle: bool) -> Self {
        let snapshot = sim.snapshot();
        Self {
            sim,
            snapshot,
            live_color: Color32::from_rgb(0, 200, 0),
            dead_color: Color32::from_rgb(40, 40, 40),
            selected_pattern: 0,
            random_seed: 1,
            stop_on_cycle,
            status: None,
            history: CycleDetector::default(),
        }
    }

    /// Pick up the latest completed generation; stops on a repeat if asked.
    fn refresh(&mut self) {
        let snapshot = self.sim.snapshot();
        let advanced = snapshot.generation > self.snapshot.generation;
        if advanced && self.stop_on_cycle && self.history.check_for_cycle(snapshot.fingerprint()) {
            let result = self.sim.stop();
            self.report(result);
            self.status.get_or_insert_with(|| format!("Cycle detected at generation {}", snapshot.generation));
        }
        self.snapshot = snapshot;
    }

    fn report(&mut self, result: conway_engine::Result<()>) {
        if let Err(err) = result { self.status = Some(err.to_string()); }
    }
}
