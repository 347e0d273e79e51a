//! # Accessor Descriptions
//!
//! The immutable, externally supplied description of an accessor: its name, its
//! declared ports, its parameter declarations and the identifier of the handler body
//! that implements it.
//!
//! ## Shape
//!
//! ```json
//! {
//!   "name": "Hue Single",
//!   "ports": [
//!     {"name": "Power", "directions": ["input"], "attributes": ["write"], "type": "bool"}
//!   ],
//!   "parameters": [{"name": "bridge_url", "required": true}],
//!   "code": "lighting/hue/huesingle"
//! }
//! ```
//!
//! Descriptions are validated once, before instantiation. Any violation of the port
//! invariants surfaces as a [`DescriptionError`], which instantiation reports as
//! `InstantiationError::MalformedDescription`.

pub mod parameter;
pub mod port;
pub mod source;

pub use parameter::{Configuration, ParameterDeclaration};
pub use port::{Direction, PortAttribute, PortDeclaration, PortType};
pub use source::{DescriptionSource, InMemoryDescriptionSource};

use crate::constants::is_lifecycle_key;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised while parsing, validating or fetching descriptions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptionError {
    #[error("could not parse description: {reason}")]
    Parse { reason: String },

    #[error("required field '{field}' is missing or empty")]
    MissingField { field: String },

    #[error("port name '{name}' is not a valid identifier")]
    InvalidPortName { name: String },

    #[error("port '{name}' is declared more than once")]
    DuplicatePort { name: String },

    #[error("port '{port}' declares no directions")]
    NoDirections { port: String },

    #[error("port '{port}' has attribute '{attribute}' but not 'event'")]
    EventAttributeWithoutEvent { port: String, attribute: String },

    #[error("select port '{port}' must declare a non-empty option set")]
    EmptySelectOptions { port: String },

    #[error("invalid bounds on port '{port}': {reason}")]
    InvalidBounds { port: String, reason: String },

    #[error("port name '{name}' is reserved for a lifecycle entry point")]
    ReservedPortName { name: String },

    #[error("parameter '{name}' is declared more than once")]
    DuplicateParameter { name: String },

    #[error("no accessor description at '{path}'")]
    NotFound { path: String },
}

impl DescriptionError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_bounds(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBounds {
            port: port.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DescriptionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
        }
    }
}

/// Accessor description (the intermediate representation served by the host registry)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessorDescription {
    pub name: String,

    pub ports: Vec<PortDeclaration>,

    /// Identifier of the handler body, opaque to everything but the body catalog
    pub code: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterDeclaration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AccessorDescription {
    /// Start a description with no ports and no parameters
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
            code: code.into(),
            parameters: Vec::new(),
            author: None,
            version: None,
            description: None,
        }
    }

    /// Builder-style port addition
    pub fn with_port(mut self, port: PortDeclaration) -> Self {
        self.ports.push(port);
        self
    }

    /// Builder-style parameter addition
    pub fn with_parameter(mut self, parameter: ParameterDeclaration) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Parse a description from its JSON text
    pub fn from_json(json: &str) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a description from an already decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, DescriptionError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Look up a declared port by name
    pub fn port(&self, name: &str) -> Option<&PortDeclaration> {
        self.ports.iter().find(|port| port.name == name)
    }

    /// Check the required fields and every port invariant
    pub fn validate(&self) -> Result<(), DescriptionError> {
        if self.name.trim().is_empty() {
            return Err(DescriptionError::missing_field("name"));
        }
        if self.code.trim().is_empty() {
            return Err(DescriptionError::missing_field("code"));
        }

        let mut seen = HashSet::new();
        for port in &self.ports {
            port.validate()?;
            if is_lifecycle_key(&port.name) {
                return Err(DescriptionError::ReservedPortName {
                    name: port.name.clone(),
                });
            }
            if !seen.insert(port.name.as_str()) {
                return Err(DescriptionError::DuplicatePort {
                    name: port.name.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for parameter in &self.parameters {
            if parameter.name.trim().is_empty() {
                return Err(DescriptionError::missing_field("parameters[].name"));
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(DescriptionError::DuplicateParameter {
                    name: parameter.name.clone(),
                });
            }
        }

        Ok(())
    }
}
