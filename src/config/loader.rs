//! Configuration Loader
//!
//! Layered loading of [`RuntimeConfig`] with the `config` crate: defaults, then an
//! optional file, then `ACCESSOR_*` environment variables.

use super::error::{ConfigResult, ConfigurationError};
use super::RuntimeConfig;
use crate::constants::{defaults, env};
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct RuntimeConfigLoader {
    file: Option<PathBuf>,
    search_stem: Option<String>,
    environment: Option<HashMap<String, String>>,
}

impl RuntimeConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from this file instead of searching for one. The file must exist.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Search for `<stem>.{toml,yaml,json}` instead of `config/accessor-runtime.*`
    pub fn with_search_stem(mut self, stem: impl Into<String>) -> Self {
        self.search_stem = Some(stem.into());
        self
    }

    /// Use `variables` in place of the process environment
    pub fn with_environment(mut self, variables: HashMap<String, String>) -> Self {
        self.environment = Some(variables);
        self
    }

    pub fn load(&self) -> ConfigResult<RuntimeConfig> {
        let environment = self
            .variable(env::ENVIRONMENT)
            .unwrap_or_else(|| defaults::ENVIRONMENT.to_string());

        let mut builder = Config::builder()
            .set_default("observer_channel_capacity", defaults::OBSERVER_CHANNEL_CAPACITY as i64)
            .and_then(|b| b.set_default("log_format", "pretty"))
            .and_then(|b| b.set_default("environment", environment.clone()))
            .map_err(ConfigurationError::load)?;

        let source_name = match self.explicit_file() {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigurationError::FileNotFound {
                        path: path.display().to_string(),
                    });
                }
                builder = builder.add_source(File::from(path.clone()).required(true));
                path.display().to_string()
            }
            None => {
                let stem = self
                    .search_stem
                    .clone()
                    .unwrap_or_else(|| defaults::CONFIG_FILE_STEM.to_string());
                builder = builder.add_source(File::with_name(&stem).required(false));
                stem
            }
        };

        builder = builder.add_source(
            Environment::with_prefix(env::CONFIG_PREFIX)
                .try_parsing(true)
                .source(self.environment.clone()),
        );

        let config: RuntimeConfig = builder
            .build()
            .map_err(ConfigurationError::load)?
            .try_deserialize()
            .map_err(|e| ConfigurationError::deserialize(source_name.clone(), e))?;

        config.validate()?;

        debug!(
            environment = %config.environment,
            source = %source_name,
            dispatch_timeout_ms = ?config.dispatch_timeout_ms,
            init_timeout_ms = ?config.init_timeout_ms,
            observer_channel_capacity = config.observer_channel_capacity,
            "Runtime configuration loaded"
        );
        Ok(config)
    }

    fn explicit_file(&self) -> Option<PathBuf> {
        self.file
            .clone()
            .or_else(|| self.variable(env::CONFIG_FILE).map(PathBuf::from))
    }

    fn variable(&self, name: &str) -> Option<String> {
        match &self.environment {
            Some(variables) => variables.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogFormat;
    use std::io::Write;
    use tempfile::TempDir;

    fn variables(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn isolated() -> RuntimeConfigLoader {
        RuntimeConfigLoader::new()
            .with_search_stem("does/not/exist/accessor-runtime")
            .with_environment(HashMap::new())
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = isolated().load().unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = isolated()
            .with_environment(variables(&[
                ("ACCESSOR_ENV", "test"),
                ("ACCESSOR_DISPATCH_TIMEOUT_MS", "2500"),
                ("ACCESSOR_LOG_FORMAT", "json"),
            ]))
            .load()
            .unwrap();

        assert_eq!(config.environment, "test");
        assert_eq!(config.dispatch_timeout_ms, Some(2500));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_file_then_environment_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("runtime.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "dispatch_timeout_ms = 1000").unwrap();
        writeln!(file, "observer_channel_capacity = 8").unwrap();

        let config = isolated()
            .with_file(&path)
            .with_environment(variables(&[("ACCESSOR_DISPATCH_TIMEOUT_MS", "3000")]))
            .load()
            .unwrap();

        assert_eq!(config.dispatch_timeout_ms, Some(3000));
        assert_eq!(config.observer_channel_capacity, 8);
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = isolated().with_file("/nonexistent/accessor-runtime.toml").load();
        assert!(matches!(result, Err(ConfigurationError::FileNotFound { .. })));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = isolated()
            .with_environment(variables(&[("ACCESSOR_OBSERVER_CHANNEL_CAPACITY", "0")]))
            .load();
        assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
    }
}
