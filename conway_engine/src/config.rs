// config.rs - Simulation parameters, loaded from TOML and validated up front

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coordinator::Delay;
use crate::error::ConfigError;

pub const DEFAULT_SIDE: usize = 100;
pub const DEFAULT_WORKERS: usize = 1;
pub const DEFAULT_TASKS: usize = 10;

/// Everything the engine needs at startup.
///
/// ```toml
/// side    = 100
/// workers = 4
/// tasks   = 10
/// delay   = { spin = 5000 }
/// glider  = false
/// seed    = [[10, 10], [10, 11], [10, 12]]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Cells on a side.
    pub side: usize,
    /// Threads in the worker pool.
    pub workers: usize,
    /// Row ranges per generation.
    pub tasks: usize,
    /// Per-cell throttle; derived from `side` when absent.
    pub delay: Option<Delay>,
    /// Place the canonical glider in the top-left corner.
    pub glider: bool,
    /// Explicit live cells as `[row, col]`.
    pub seed: Vec<(usize, usize)>,
    /// Fill with pseudo-random cells from this seed.
    pub random: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            side: DEFAULT_SIDE,
            workers: DEFAULT_WORKERS,
            tasks: DEFAULT_TASKS,
            delay: None,
            glider: false,
            seed: Vec::new(),
            random: None,
        }
    }
}

impl SimulationConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn effective_delay(&self) -> Delay {
        self.delay.unwrap_or_else(|| Delay::default_for(self.side))
    }

    /// Reject values that would prevent the simulation from starting.
    /// Seed cells are not checked here; see `split_seed`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side == 0 { return Err(ConfigError::ZeroSide); }
        if self.workers == 0 { return Err(ConfigError::Workers(self.workers)); }
        if self.tasks == 0 || self.tasks > self.side {
            return Err(ConfigError::Tasks { tasks: self.tasks, side: self.side });
        }
        let delay = self.effective_delay();
        if !delay.is_valid() { return Err(ConfigError::Delay(format!("{delay:?}"))); }
        Ok(())
    }

    /// Seed cells split into those on the board and those outside it.
    pub fn split_seed(&self) -> (Vec<(usize, usize)>, Vec<(usize, usize)>) {
        self.seed.iter().copied().partition(|&(row, col)| row < self.side && col < self.side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SimulationConfig::from_toml("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert!(config.validate().is_ok());
        assert_eq!(config.effective_delay(), Delay::Sleep(Duration::from_micros(50)));
    }

    #[test]
    fn parses_full_file() {
        let config = SimulationConfig::from_toml(
            r#"
            side    = 20
            workers = 4
            tasks   = 6
            delay   = { sleep_us = 250 }
            glider  = true
            seed    = [[1, 2], [3, 4]]
            random  = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.side, 20);
        assert_eq!(config.workers, 4);
        assert_eq!(config.tasks, 6);
        assert_eq!(config.delay, Some(Delay::Sleep(Duration::from_micros(250))));
        assert!(config.glider);
        assert_eq!(config.seed, vec![(1, 2), (3, 4)]);
        assert_eq!(config.random, Some(7));
    }

    #[test]
    fn load_keeps_the_underlying_error() {
        use std::error::Error as _;

        let err = SimulationConfig::load("/nonexistent/conway.toml").unwrap_err();
        assert!(matches!(&err, ConfigError::Io { path, .. } if path.ends_with("conway.toml")));
        let source = err.source().and_then(|source| source.downcast_ref::<std::io::Error>());
        assert_eq!(source.map(|io| io.kind()), Some(std::io::ErrorKind::NotFound));

        let err = SimulationConfig::from_toml("side = \"wide\"").unwrap_err();
        assert!(err.source().is_some_and(|source| source.is::<toml::de::Error>()));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(matches!(
            SimulationConfig::from_toml("threads = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn validation_catches_bad_values() {
        let base = SimulationConfig { side: 10, tasks: 5, ..Default::default() };
        assert!(base.validate().is_ok());

        let cases = [
            (SimulationConfig { side: 0, ..base.clone() }, ConfigError::ZeroSide),
            (SimulationConfig { workers: 0, ..base.clone() }, ConfigError::Workers(0)),
            (SimulationConfig { tasks: 0, ..base.clone() }, ConfigError::Tasks { tasks: 0, side: 10 }),
            (SimulationConfig { tasks: 11, ..base.clone() }, ConfigError::Tasks { tasks: 11, side: 10 }),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate().unwrap_err().to_string(), expected.to_string());
        }

        let zero_spin = SimulationConfig { delay: Some(Delay::Spin(0)), ..base };
        assert!(matches!(zero_spin.validate(), Err(ConfigError::Delay(_))));
    }

    #[test]
    fn seed_cells_outside_the_board_are_split_off() {
        let config = SimulationConfig {
            side: 5,
            tasks: 1,
            seed: vec![(0, 0), (5, 1), (4, 4), (2, 7)],
            ..Default::default()
        };
        let (valid, rejected) = config.split_seed();
        assert_eq!(valid, vec![(0, 0), (4, 4)]);
        assert_eq!(rejected, vec![(5, 1), (2, 7)]);
        assert!(config.validate().is_ok());
    }
}
