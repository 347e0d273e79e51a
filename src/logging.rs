//! # Structured Logging Module
//!
//! Environment-aware structured logging for the accessor runtime, plus structured
//! operation loggers used by the registry and dispatch layers.

use crate::config::{LogFormat, RuntimeConfig};
use crate::constants::{defaults, env};
use crate::description::Direction;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    let environment = get_environment();
    init_logging(&environment, LogFormat::Pretty);
}

/// Initialize structured logging from a loaded runtime configuration
pub fn init_logging_with(config: &RuntimeConfig) {
    init_logging(&config.environment, config.log_format);
}

fn init_logging(environment: &str, format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let log_level = get_log_level(environment);
        // RUST_LOG wins over the environment-derived level
        let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));

        let console = match format {
            LogFormat::Pretty => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter())
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter())
                .boxed(),
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry().with(console).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            format = ?format,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
pub fn get_environment() -> String {
    std::env::var(env::ENVIRONMENT).unwrap_or_else(|_| defaults::ENVIRONMENT.to_string())
}

/// Get log level based on environment
pub fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for dispatch operations
pub fn log_dispatch_operation(
    accessor: &str,
    port: &str,
    direction: Option<Direction>,
    handlers: usize,
    status: &str,
) {
    tracing::debug!(
        accessor = %accessor,
        port = %port,
        direction = direction.map_or("lifecycle", |d| d.as_str()),
        handlers = handlers,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "📡 DISPATCH_OPERATION"
    );
}

/// Log structured data for registry operations
pub fn log_registry_operation(operation: &str, accessor: &str, key: &str, status: &str) {
    tracing::info!(
        operation = %operation,
        accessor = %accessor,
        key = %key,
        status = %status,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 REGISTRY_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}
