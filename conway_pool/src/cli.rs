// cli.rs - Command-line flags, layered over an optional TOML config file

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use conway_engine::{ConfigError, Delay, SimulationConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multithreaded Conway's Game of Life on a torus", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML); flags below take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Threads in the worker pool
    #[arg(short = 't', long)]
    pub workers: Option<usize>,

    /// Row-range tasks per generation (1..=side)
    #[arg(short = 'k', long)]
    pub tasks: Option<usize>,

    /// Busy-wait iterations per cell update
    #[arg(short = 's', long, conflicts_with_all = ["sleep_us", "no_delay"])]
    pub spin: Option<u32>,

    /// Sleep per cell update, in microseconds
    #[arg(long, conflicts_with = "no_delay")]
    pub sleep_us: Option<u64>,

    /// Run without any per-cell delay
    #[arg(long)]
    pub no_delay: bool,

    /// Cells on a side
    #[arg(short = 'n', long)]
    pub side: Option<usize>,

    /// Start with a glider in the top-left corner
    #[arg(long)]
    pub glider: bool,

    /// Fill the board pseudo-randomly from this seed
    #[arg(long)]
    pub random: Option<u64>,

    /// Run without a window
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many generations (headless only)
    #[arg(long, requires = "headless")]
    pub generations: Option<u64>,

    /// Stop when the board repeats a recent state
    #[arg(long)]
    pub stop_on_cycle: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    pub fn to_config(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)?,
            None => SimulationConfig::default(),
        };

        if let Some(side) = self.side { config.side = side; }
        if let Some(workers) = self.workers { config.workers = workers; }
        match self.tasks {
            Some(tasks) => config.tasks = tasks,
            None => config.tasks = config.tasks.min(config.side.max(1)),
        }

        if self.no_delay {
            config.delay = Some(Delay::None);
        } else if let Some(spin) = self.spin {
            config.delay = Some(Delay::Spin(spin));
        } else if let Some(micros) = self.sleep_us {
            config.delay = Some(Delay::Sleep(Duration::from_micros(micros)));
        }

        if self.glider { config.glider = true; }
        if self.random.is_some() { config.random = self.random; }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from(["conway", "-t", "4", "-k", "8", "-s", "300", "-n", "40", "--glider"]);
        let config = cli.to_config().unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.tasks, 8);
        assert_eq!(config.side, 40);
        assert_eq!(config.delay, Some(Delay::Spin(300)));
        assert!(config.glider);
    }

    #[test]
    fn small_board_caps_default_task_count() {
        let cli = Cli::parse_from(["conway", "-n", "6"]);
        assert_eq!(cli.to_config().unwrap().tasks, 6);
    }

    #[test]
    fn invalid_values_are_reported() {
        let cli = Cli::parse_from(["conway", "-t", "0"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::Workers(0))));

        let cli = Cli::parse_from(["conway", "-n", "10", "-k", "11"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::Tasks { tasks: 11, side: 10 })));

        let cli = Cli::parse_from(["conway", "-s", "0"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::Delay(_))));
    }

    #[test]
    fn delay_flags_conflict() {
        assert!(Cli::try_parse_from(["conway", "-s", "5", "--sleep-us", "5"]).is_err());
        assert!(Cli::try_parse_from(["conway", "--generations", "5"]).is_err());
        assert!(Cli::try_parse_from(["conway", "--headless", "--generations", "5"]).is_ok());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["conway", "-c", "/nonexistent/conway.toml"]);
        assert!(matches!(cli.to_config(), Err(ConfigError::Io { .. })));
    }
}
