use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const WIDTH: usize = 10;
pub const HEIGHT: usize = 20;

/// Match timing and rules. Fixed for the lifetime of the server process;
/// clients never negotiate any of these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchConfig {
    pub tick_interval_ms: u64,
    pub drop_interval_ms: u64,
    pub soft_drop_interval_ms: u64,
    pub time_limit_ms: u64,
    /// 1 means a single-life match.
    pub starting_lives: u32,
    pub sequence_length: usize,
    pub combo_multiplier: f64,
    /// Fixed seed for every match, mostly useful for replays and tests.
    pub seed: Option<u64>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            drop_interval_ms: 1000,
            soft_drop_interval_ms: 50,
            time_limit_ms: 180_000,
            starting_lives: 3,
            sequence_length: 1500,
            combo_multiplier: 1.2,
            seed: None,
        }
    }
}

impl MatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MatchConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tickIntervalMs must be positive"));
        }
        if self.drop_interval_ms == 0 || self.soft_drop_interval_ms == 0 {
            return Err(ConfigError::Invalid("drop intervals must be positive"));
        }
        if self.starting_lives == 0 {
            return Err(ConfigError::Invalid("startingLives must be at least 1"));
        }
        if self.sequence_length < 2 {
            return Err(ConfigError::Invalid("sequenceLength must be at least 2"));
        }
        if !(self.combo_multiplier >= 1.0) {
            return Err(ConfigError::Invalid("comboMultiplier must be at least 1.0"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}
