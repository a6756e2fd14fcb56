//! Configuration management and validation.
//!
//! Provides the monitor configuration: pipeline chunking, the initial
//! selection, and where upstream payloads come from. Values are layered:
//! defaults, then an optional JSON config file, then environment variables,
//! then command-line overrides applied by the caller.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_CHUNK_PAUSE_MS, DEFAULT_CHUNK_SIZE, DEFAULT_PERIOD,
    DEFAULT_YEAR, DEFAULT_ZONE, ENV_BASE_URL, ENV_CHUNK_SIZE, ENV_DATA_DIR,
};
use crate::error::{CropwatchError, Result};
use crate::models::{AttributeSelection, GrowthPeriod, Zone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Global configuration for the zone monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Records classified per chunk
    pub chunk_size: usize,

    /// Pause between chunks in milliseconds (0 = yield only)
    pub chunk_pause_ms: u64,

    /// Base URL of the upstream REST service
    pub base_url: Option<String>,

    /// Directory holding `<zone>.json` payloads and standard payloads
    pub data_dir: Option<PathBuf>,

    /// Zone selected at start-up
    pub zone: Zone,

    /// Growth period selected at start-up
    pub period: GrowthPeriod,

    /// Year selected at start-up
    pub year: i32,

    /// Attributes compared at start-up
    pub attributes: AttributeSelection,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_pause_ms: DEFAULT_CHUNK_PAUSE_MS,
            base_url: None,
            data_dir: None,
            zone: DEFAULT_ZONE,
            period: DEFAULT_PERIOD,
            year: DEFAULT_YEAR,
            attributes: AttributeSelection::all(),
        }
    }
}

impl MonitorConfig {
    /// Default config file location, e.g. `~/.config/cropwatch/config.json`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            CropwatchError::configuration("could not determine user config directory")
        })?;
        Ok(config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Read a JSON config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CropwatchError::configuration(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&contents).map_err(|e| {
            CropwatchError::configuration(format!(
                "invalid config file {}: {e}",
                path.display()
            ))
        })
    }

    /// Defaults, then the config file (explicit path or default location if it exists),
    /// then environment variables
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path() {
                Ok(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = Some(url);
        }
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(size) = lookup(ENV_CHUNK_SIZE) {
            self.chunk_size = size.trim().parse().map_err(|_| {
                CropwatchError::configuration(format!(
                    "{ENV_CHUNK_SIZE} must be a number, got '{size}'"
                ))
            })?;
        }
        Ok(())
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CropwatchError::configuration("chunk_size must be at least 1"));
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CropwatchError::configuration(format!(
                    "base_url must start with http:// or https://, got '{url}'"
                )));
            }
        }
        Ok(())
    }

    pub fn chunk_pause(&self) -> Duration {
        Duration::from_millis(self.chunk_pause_ms)
    }

    /// Set chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the pause between chunks
    pub fn with_chunk_pause_ms(mut self, pause_ms: u64) -> Self {
        self.chunk_pause_ms = pause_ms;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_period(mut self, period: GrowthPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn with_attributes(mut self, attributes: AttributeSelection) -> Self {
        self.attributes = attributes;
        self
    }
}
