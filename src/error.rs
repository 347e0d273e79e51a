//! # Error Types
//!
//! Structured error families for the accessor execution core using `thiserror`.
//!
//! ## Propagation
//!
//! - [`InstantiationError`] and [`RegistrationError`] are returned synchronously to
//!   whoever asked for the action.
//! - [`DispatchFailure`] never escapes a dispatch call: it is delivered through the
//!   call's completion callback as the error half of a [`DispatchResult`].
//! - [`HandlerError`] is what handler code returns; the dispatch engine wraps it into
//!   a [`DispatchFailure`] carrying the port and direction it came from.

use crate::config::ConfigurationError;
use crate::description::{DescriptionError, Direction};
use crate::runtime::AccessorInstance;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result handed to completion callbacks: `Ok(None)` is success with no value
pub type DispatchResult = std::result::Result<Option<Value>, DispatchFailure>;

/// Result type returned by handler functions
pub type HandlerResult = std::result::Result<Option<Value>, HandlerError>;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, AccessorError>;

/// Direction label used in error messages, `None` being the lifecycle direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionLabel(pub Option<Direction>);

impl fmt::Display for DirectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(direction) => write!(f, "{direction}"),
            None => write!(f, "lifecycle"),
        }
    }
}

/// Failure raised by handler code
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HandlerError {
    #[error("{message}")]
    Failed { message: String },

    #[error("invalid value for port '{port}': {reason}")]
    InvalidValue { port: String, reason: String },

    #[error("missing parameter '{name}'")]
    MissingParameter { name: String },

    #[error("device request failed: {operation}: {message}")]
    Device { operation: String, message: String },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn invalid_value(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            port: port.into(),
            reason: reason.into(),
        }
    }

    pub fn device(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Device {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed {
            message: format!("{err:#}"),
        }
    }
}

/// Any failure raised inside a dispatch call's isolation scope
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchFailure {
    #[error("handler for {port} ({direction}) failed: {cause}")]
    Handler {
        port: String,
        direction: DirectionLabel,
        cause: HandlerError,
    },

    #[error("handler for {port} ({direction}) panicked: {message}")]
    Panicked {
        port: String,
        direction: DirectionLabel,
        message: String,
    },

    #[error("dispatch of {port} ({direction}) timed out after {timeout_ms}ms")]
    TimedOut {
        port: String,
        direction: DirectionLabel,
        timeout_ms: u64,
    },

    #[error("pending read of {port} was superseded by a newer read")]
    Superseded { port: String },

    #[error("no {direction} entry point for port '{port}'")]
    UnknownEntryPoint {
        port: String,
        direction: DirectionLabel,
    },

    #[error("lifecycle entry point '{port}' was already invoked")]
    AlreadyInvoked { port: String },
}

impl DispatchFailure {
    /// Port the failure originated from
    pub fn port(&self) -> &str {
        match self {
            Self::Handler { port, .. }
            | Self::Panicked { port, .. }
            | Self::TimedOut { port, .. }
            | Self::Superseded { port }
            | Self::UnknownEntryPoint { port, .. }
            | Self::AlreadyInvoked { port } => port,
        }
    }

    /// Handler-raised cause, if the failure came from handler code
    pub fn handler_cause(&self) -> Option<&HandlerError> {
        match self {
            Self::Handler { cause, .. } => Some(cause),
            _ => None,
        }
    }

    pub fn unknown_entry_point(port: impl Into<String>, direction: Option<Direction>) -> Self {
        Self::UnknownEntryPoint {
            port: port.into(),
            direction: DirectionLabel(direction),
        }
    }
}

/// Failure while binding or unbinding handlers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("handler already registered for {port} ({direction})")]
    DuplicateHandler { port: String, direction: String },

    #[error("port '{port}' is not declared by this accessor")]
    UnknownPort { port: String },

    #[error("malformed handler token: {reason}")]
    MalformedToken { reason: String },
}

impl RegistrationError {
    pub fn duplicate(port: impl Into<String>, direction: impl fmt::Display) -> Self {
        Self::DuplicateHandler {
            port: port.into(),
            direction: direction.to_string(),
        }
    }

    pub fn unknown_port(port: impl Into<String>) -> Self {
        Self::UnknownPort { port: port.into() }
    }

    pub fn malformed_token(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }
}

/// Failure raised while a handler body executes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BodyError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("parameter '{name}': {reason}")]
    Parameter { name: String, reason: String },

    #[error("{message}")]
    Failed { message: String },
}

impl BodyError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for BodyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Failed {
            message: format!("{err:#}"),
        }
    }
}

/// Failure while turning a description and configuration into a live instance
#[derive(Error, Debug)]
pub enum InstantiationError {
    #[error("malformed accessor description: {0}")]
    MalformedDescription(#[from] DescriptionError),

    #[error("invalid runtime configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),

    #[error("accessor '{accessor}' requires parameter '{name}'")]
    MissingParameter { accessor: String, name: String },

    #[error("accessor '{accessor}' must be instantiated inside a tokio runtime")]
    RuntimeUnavailable { accessor: String },

    #[error("handler body of '{accessor}' failed: {cause}")]
    BodyExecutionFailed { accessor: String, cause: BodyError },

    /// The instance still exists and is returned for inspection
    #[error("init of '{}' failed: {cause}", instance.name())]
    InitFailed {
        instance: Arc<AccessorInstance>,
        cause: DispatchFailure,
    },
}

impl InstantiationError {
    /// Instance left behind by a failed init, if any
    pub fn instance(&self) -> Option<&Arc<AccessorInstance>> {
        match self {
            Self::InitFailed { instance, .. } => Some(instance),
            _ => None,
        }
    }
}

/// Failure in the active accessor host
#[derive(Error, Debug)]
pub enum HostError {
    #[error("an accessor named '{name}' is already active")]
    AlreadyActive { name: String },

    #[error("no active accessor named '{name}'")]
    NotFound { name: String },

    #[error("could not retrieve accessor description for '{path}': {source}")]
    DescriptionUnavailable {
        path: String,
        #[source]
        source: DescriptionError,
    },

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error("wrapup of '{name}' failed: {cause}")]
    WrapupFailed {
        name: String,
        cause: DispatchFailure,
    },
}

/// Top-level error aggregating every family
#[derive(Error, Debug)]
pub enum AccessorError {
    #[error(transparent)]
    Description(#[from] DescriptionError),

    #[error(transparent)]
    Instantiation(#[from] InstantiationError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchFailure),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Host(#[from] HostError),
}
