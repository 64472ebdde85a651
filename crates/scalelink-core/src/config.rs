//! Driver configuration
//!
//! Loaded once at startup from the `scaleDriver` section of a JSON file:
//!
//! ```json
//! {
//!   "scaleDriver": {
//!     "driver": "mettler_toledo_8217",
//!     "port": "/dev/ttyS0",
//!     "baudRate": 9600,
//!     "pollInterval": 0.2,
//!     "onConnectionLoss": "disconnected"
//!   }
//! }
//! ```
//!
//! Every key is optional and falls back to the value shown above.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::driver::DriverKind;
use crate::poll::ConnectionLossPolicy;
use crate::protocol::DEFAULT_BAUD_RATE;

/// Default serial port
pub const DEFAULT_PORT: &str = "/dev/ttyS0";

/// Default seconds between poll cycles
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 0.2;

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Cannot read config file: {0}")]
    Io(#[from] io::Error),

    /// Config file is not valid JSON for this schema
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is structurally unusable
    #[error("Invalid config value for '{key}': {reason}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Top-level config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleLinkConfig {
    /// Scale driver section
    #[serde(default)]
    pub scale_driver: DriverConfig,
}

/// Scale driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// Which protocol implementation to run
    #[serde(default)]
    pub driver: DriverKind,

    /// Serial port name
    #[serde(default = "default_port")]
    pub port: String,

    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,

    /// What to publish when the link drops mid-poll
    #[serde(default)]
    pub on_connection_loss: ConnectionLossPolicy,
}

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_poll_interval() -> f64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            port: default_port(),
            baud_rate: default_baud_rate(),
            poll_interval: default_poll_interval(),
            on_connection_loss: ConnectionLossPolicy::default(),
        }
    }
}

impl DriverConfig {
    /// Load the `scaleDriver` section from a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.as_ref().display(),
            driver = ?config.driver,
            port = %config.port,
            baud = config.baud_rate,
            "loaded scale driver config"
        );
        Ok(config)
    }

    /// Parse a JSON config document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let file: ScaleLinkConfig = serde_json::from_str(content)?;
        let config = file.scale_driver;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no driver could work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid {
                key: "baudRate",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.port.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "port",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Poll interval as a duration; unusable values fall back to the default
    pub fn poll_interval(&self) -> Duration {
        if self.poll_interval.is_finite() && self.poll_interval > 0.0 {
            Duration::from_secs_f64(self.poll_interval)
        } else {
            tracing::warn!(
                poll_interval = self.poll_interval,
                "invalid pollInterval, using {}s",
                DEFAULT_POLL_INTERVAL_SECS
            );
            Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS)
        }
    }
}
