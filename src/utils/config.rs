//! Reader configuration
//!
//! Settings are layered: defaults, then an optional JSON file, then
//! `PMS_*` environment variables. Command-line flags are applied last by
//! the binary.

use crate::core::DEFAULT_TIMEOUT_SECS;
use crate::reader::Reader;
use crate::sensor::Sensor;
use crate::stream::Stream;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const ENV_SENSOR_MODEL: &str = "PMS_SENSOR_MODEL";
pub const ENV_SERIAL: &str = "PMS_SERIAL";
pub const ENV_INTERVAL: &str = "PMS_INTERVAL";
pub const ENV_SAMPLES: &str = "PMS_SAMPLES";
pub const ENV_MAX_RETRIES: &str = "PMS_MAX_RETRIES";

/// Configuration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Invalid parameter value
    #[error("invalid {parameter} '{value}': {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Configuration file I/O error
    #[error("{message}")]
    IoError { message: String },

    /// JSON serialization/deserialization error
    #[error("{message}")]
    SerializationError { message: String },
}

impl ConfigError {
    fn invalid(parameter: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Acquisition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Sensor model
    pub sensor: Sensor,
    /// Serial port device
    pub port: String,
    /// Seconds between readings
    pub interval: Option<f64>,
    /// Readings per run; unbounded when absent
    pub samples: Option<usize>,
    /// Consecutive failed reads tolerated; unlimited when absent
    pub max_retries: Option<usize>,
    /// Serial read timeout (seconds)
    pub timeout_secs: f64,
    /// Override the model's pre-heat time (seconds)
    pub pre_heat_secs: Option<u64>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            sensor: Sensor::default(),
            port: "/dev/ttyUSB0".to_string(),
            interval: None,
            samples: None,
            max_retries: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            pre_heat_secs: None,
        }
    }
}

impl ReaderConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            message: format!("Failed to read config file '{}': {}", path_str, e),
        })?;

        let config: ReaderConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })?;

        config.validate()?;
        log::debug!("loaded configuration from {}", path_str);
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            })?;

        fs::write(&path, content).map_err(|e| ConfigError::IoError {
            message: format!("Failed to write config file '{}': {}", path_str, e),
        })
    }

    /// Apply `PMS_*` variables from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `PMS_*` variables looked up through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_SENSOR_MODEL) {
            self.sensor = value
                .parse()
                .map_err(|reason: String| ConfigError::invalid(ENV_SENSOR_MODEL, &value, &reason))?;
        }
        if let Some(value) = lookup(ENV_SERIAL) {
            self.port = value;
        }
        if let Some(value) = lookup(ENV_INTERVAL) {
            let interval = value
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_INTERVAL, &value, "not a number"))?;
            self.interval = Some(interval);
        }
        if let Some(value) = lookup(ENV_SAMPLES) {
            let samples = value
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_SAMPLES, &value, "not a whole number"))?;
            self.samples = Some(samples);
        }
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            let retries = value
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_MAX_RETRIES, &value, "not a whole number"))?;
            self.max_retries = Some(retries);
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::invalid("port", &self.port, "port must not be empty"));
        }
        if let Some(interval) = self.interval {
            if Duration::try_from_secs_f64(interval).is_err() {
                return Err(ConfigError::invalid(
                    "interval",
                    interval,
                    "interval must be a non-negative number of seconds",
                ));
            }
        }
        match Duration::try_from_secs_f64(self.timeout_secs) {
            Ok(timeout) if !timeout.is_zero() => {}
            _ => {
                return Err(ConfigError::invalid(
                    "timeout_secs",
                    self.timeout_secs,
                    "timeout must be a positive number of seconds",
                ))
            }
        }
        Ok(())
    }

    /// Interval between readings; out-of-range values read as none
    pub fn interval(&self) -> Option<Duration> {
        self.interval
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Serial read timeout; out-of-range values fall back to the default
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Reader over `stream` with these pacing and retry settings
    pub fn reader<S: Stream>(&self, stream: S) -> Reader<S> {
        Reader::new(stream)
            .with_interval(self.interval())
            .with_samples(self.samples)
            .with_max_retries(self.max_retries)
    }
}
