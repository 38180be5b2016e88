//! Race parameters
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::Grid;

/// largest accepted grid side
pub const MAX_GRID_SIDE: u32 = 1024;

/// Reasons a race can't be set up
#[derive(Debug, Error)]
pub enum ConfigError {
    /// width or height of zero
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroDimension {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
    },
    /// an agent needs its own cell plus one for food
    #[error("grid needs at least 2 cells, got {cells}")]
    GridTooSmall {
        #[allow(missing_docs)]
        cells: usize,
    },
    /// either side over `MAX_GRID_SIDE`
    #[error("grid sides are limited to {max}, got {width}x{height}", max = MAX_GRID_SIDE)]
    GridTooLarge {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
    },
    /// a tick rate of zero can't be mapped to seconds
    #[error("tick rate must be positive")]
    ZeroTickRate,
    /// a race with no time in it
    #[error("time limit must be at least one tick")]
    ZeroTimeLimit,
    /// bad json
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// couldn't read the config file
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything fixed for the length of a race. Time is counted in ticks,
/// `tick_rate_hz` only maps ticks to seconds for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// grid columns
    pub width: u32,
    /// grid rows
    pub height: u32,
    /// ticks per displayed second
    pub tick_rate_hz: u32,
    /// the race ends after this many ticks even if an agent is still alive
    pub time_limit_ticks: u64,
}

impl Default for RaceConfig {
    fn default() -> Self {
        // 20x20 boards, 16 ticks a second, one minute
        RaceConfig {
            width: 20,
            height: 20,
            tick_rate_hz: 16,
            time_limit_ticks: 60 * 16,
        }
    }
}

impl RaceConfig {
    /// parse a config from json, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RaceConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// read and parse a json config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// reject anything a race can't run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > MAX_GRID_SIDE || self.height > MAX_GRID_SIDE {
            return Err(ConfigError::GridTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        let cells = self.grid().area();
        if cells < 2 {
            return Err(ConfigError::GridTooSmall { cells });
        }
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.time_limit_ticks == 0 {
            return Err(ConfigError::ZeroTimeLimit);
        }
        Ok(())
    }

    /// the grid each agent gets
    pub fn grid(&self) -> Grid {
        Grid::new(self.width, self.height)
    }

    /// convert a tick count to displayed seconds
    pub fn ticks_to_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.tick_rate_hz as f64
    }

    #[allow(missing_docs)]
    pub fn time_limit_secs(&self) -> f64 {
        self.ticks_to_secs(self.time_limit_ticks)
    }
}
