//! # Handler Bodies
//!
//! A handler body is the code that turns a description into behaviour. It runs once
//! per instantiation, against a [`BodyScope`] that exposes only the configuration, the
//! placeholders of the declared ports and the registration primitives. Its sole
//! effect is populating the instance's handler registry.
//!
//! ```rust
//! use accessor_core::error::BodyError;
//! use accessor_core::runtime::{AccessorBody, BodyScope, Handler};
//! use serde_json::json;
//!
//! struct Thermometer;
//!
//! impl AccessorBody for Thermometer {
//!     fn execute(&self, scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
//!         scope.port("Temperature")?.on_output(Handler::direct("sample", |ctx, _| {
//!             ctx.publish("Temperature", json!(21.5));
//!             Ok(None)
//!         }))?;
//!         Ok(())
//!     }
//! }
//! ```

use super::context::AccessorLog;
use super::handler::Handler;
use super::shared::InstanceShared;
use crate::description::{Configuration, Direction, PortDeclaration};
use crate::error::{BodyError, RegistrationError};
use crate::registry::{HandlerToken, Lifecycle};
use serde_json::Value;
use std::sync::Arc;

/// Compiled handler body registered in the [`BodyCatalog`](crate::registry::BodyCatalog)
pub trait AccessorBody: Send + Sync {
    fn execute(&self, scope: &mut BodyScope<'_>) -> Result<(), BodyError>;
}

impl<F> AccessorBody for F
where
    F: Fn(&mut BodyScope<'_>) -> Result<(), BodyError> + Send + Sync,
{
    fn execute(&self, scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
        self(scope)
    }
}

/// What a handler body can see while it executes
pub struct BodyScope<'a> {
    shared: &'a Arc<InstanceShared>,
}

impl<'a> BodyScope<'a> {
    pub(crate) fn new(shared: &'a Arc<InstanceShared>) -> Self {
        Self { shared }
    }

    pub fn accessor_name(&self) -> &str {
        &self.shared.name
    }

    pub fn parameters(&self) -> &Configuration {
        &self.shared.configuration
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.shared.configuration.get(name)
    }

    pub fn require_parameter(&self, name: &str) -> Result<&Value, BodyError> {
        self.parameter(name).ok_or_else(|| BodyError::Parameter {
            name: name.to_string(),
            reason: "not present in configuration".to_string(),
        })
    }

    /// Placeholder of a declared port. Undeclared names have no placeholder.
    pub fn port(&self, name: &str) -> Result<PortPlaceholder<'a>, RegistrationError> {
        let shared: &'a Arc<InstanceShared> = self.shared;
        shared
            .declaration(name)
            .map(|declaration| PortPlaceholder {
                shared,
                declaration,
            })
            .ok_or_else(|| RegistrationError::unknown_port(name))
    }

    pub fn add_input_handler(&mut self, port: &str, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_handler(port, Direction::Input, handler)
    }

    pub fn add_output_handler(&mut self, port: &str, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_handler(port, Direction::Output, handler)
    }

    /// Catch-all registration run on every input dispatch
    pub fn add_fire_handler(&mut self, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_fire_handler(handler)
    }

    pub fn remove_handler(&mut self, token: &HandlerToken) -> Result<bool, RegistrationError> {
        self.shared.registry.remove_handler(token)
    }

    /// Define the init lifecycle function; a later definition replaces it
    pub fn define_init(&mut self, handler: Handler) {
        self.shared.registry.define_lifecycle(Lifecycle::Init, handler);
    }

    pub fn define_wrapup(&mut self, handler: Handler) {
        self.shared.registry.define_lifecycle(Lifecycle::Wrapup, handler);
    }

    pub fn log(&self) -> AccessorLog<'_> {
        AccessorLog::new(&self.shared.name)
    }
}

/// Attachment point for the handlers of one declared port
pub struct PortPlaceholder<'a> {
    shared: &'a Arc<InstanceShared>,
    declaration: &'a PortDeclaration,
}

impl PortPlaceholder<'_> {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    pub fn declaration(&self) -> &PortDeclaration {
        self.declaration
    }

    pub fn on_input(&self, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared
            .registry
            .add_handler(&self.declaration.name, Direction::Input, handler)
    }

    pub fn on_output(&self, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared
            .registry
            .add_handler(&self.declaration.name, Direction::Output, handler)
    }
}
