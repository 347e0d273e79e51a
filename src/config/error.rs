//! Configuration Error Types
//!
//! Errors raised while loading and validating the runtime configuration.

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration sources could not be read or merged
    #[error("Failed to load runtime configuration: {error}")]
    Load { error: String },

    /// Merged configuration did not match the expected shape
    #[error("Invalid runtime configuration from {source_name}: {error}")]
    Deserialize { source_name: String, error: String },

    /// Configuration file named explicitly but missing
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    pub fn load<E: std::fmt::Display>(error: E) -> Self {
        Self::Load {
            error: error.to_string(),
        }
    }

    pub fn deserialize<S: Into<String>, E: std::fmt::Display>(source_name: S, error: E) -> Self {
        Self::Deserialize {
            source_name: source_name.into(),
            error: error.to_string(),
        }
    }

    pub fn invalid_value<F: Into<String>, V: Into<String>, C: Into<String>>(
        field: F,
        value: V,
        context: C,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            context: context.into(),
        }
    }
}
