//! # Runtime Configuration
//!
//! Settings of the accessor runtime itself (not of individual accessors, whose
//! parameters travel in a [`Configuration`](crate::description::Configuration) map).
//!
//! ## Sources, lowest precedence first
//!
//! 1. Built-in defaults
//! 2. `config/accessor-runtime.{toml,yaml,json}` if present, or the file named by
//!    `ACCESSOR_CONFIG_FILE`
//! 3. `ACCESSOR_*` environment variables, e.g. `ACCESSOR_DISPATCH_TIMEOUT_MS=5000`
//!
//! ```rust,no_run
//! use accessor_core::config::RuntimeConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RuntimeConfigLoader::new().load()?;
//! println!("dispatch timeout: {:?}", config.dispatch_timeout());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::RuntimeConfigLoader;

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Deadline for every dispatch; `None` lets dispatches run unbounded
    pub dispatch_timeout_ms: Option<u64>,

    /// Deadline for the init dispatch; falls back to `dispatch_timeout_ms`
    pub init_timeout_ms: Option<u64>,

    /// Buffer size of each `PortStream`
    pub observer_channel_capacity: usize,

    pub log_format: LogFormat,

    pub environment: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_ms: None,
            init_timeout_ms: None,
            observer_channel_capacity: defaults::OBSERVER_CHANNEL_CAPACITY,
            log_format: LogFormat::Pretty,
            environment: defaults::ENVIRONMENT.to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout_ms.map(Duration::from_millis)
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        self.init_timeout_ms
            .or(self.dispatch_timeout_ms)
            .map(Duration::from_millis)
    }

    /// Sub-millisecond durations round up to 1 ms
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout_ms = Some(whole_millis(timeout));
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout_ms = Some(whole_millis(timeout));
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Validate configuration for consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.dispatch_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "dispatch_timeout_ms",
                "0",
                "timeout must be greater than 0; omit it to disable the deadline",
            ));
        }

        if self.init_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "init_timeout_ms",
                "0",
                "timeout must be greater than 0; omit it to disable the deadline",
            ));
        }

        if self.observer_channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "observer_channel_capacity",
                "0",
                "channel capacity must be greater than 0",
            ));
        }

        if self.environment.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "environment",
                "",
                "environment name must not be empty",
            ));
        }

        Ok(())
    }
}

fn whole_millis(timeout: Duration) -> u64 {
    let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    if millis == 0 && !timeout.is_zero() {
        1
    } else {
        millis
    }
}
