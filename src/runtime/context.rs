//! # Handler Context
//!
//! The Standard Library Surface handed to every handler invocation: read a bound
//! input value, publish an output value, read a configuration parameter, log. It also
//! carries the registration primitives and lets a handler start extra work inside
//! the isolation scope of the dispatch that invoked it.

use super::handler::Handler;
use super::scope::{IsolationScope, UnitKind};
use super::shared::InstanceShared;
use crate::description::{Configuration, Direction};
use crate::error::{HandlerError, RegistrationError};
use crate::registry::HandlerToken;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Handle given to a handler for the duration of one dispatch
#[derive(Clone)]
pub struct HandlerContext {
    shared: Arc<InstanceShared>,
    scope: Arc<IsolationScope>,
}

impl HandlerContext {
    pub(crate) fn new(shared: Arc<InstanceShared>, scope: Arc<IsolationScope>) -> Self {
        Self { shared, scope }
    }

    pub fn accessor_name(&self) -> &str {
        &self.shared.name
    }

    pub fn instance_id(&self) -> Uuid {
        self.shared.id
    }

    /// Port (or lifecycle key) of the dispatch this handler runs for
    pub fn dispatch_port(&self) -> &str {
        self.scope.port()
    }

    pub fn dispatch_direction(&self) -> Option<Direction> {
        self.scope.direction()
    }

    /// Value most recently written to input `port`
    pub fn get(&self, port: &str) -> Option<Value> {
        self.shared.input_value(port)
    }

    /// Publish `value` on output `port`. Publishing on a port that is not a declared
    /// output is logged and dropped.
    pub fn publish(&self, port: &str, value: impl Into<Value>) {
        if !self.shared.declares(port, Direction::Output) {
            warn!(
                accessor = %self.shared.name,
                port = port,
                "Dropping publish on a port that is not a declared output"
            );
            return;
        }
        self.shared.publication.publish(port, value.into());
    }

    pub fn parameters(&self) -> &Configuration {
        &self.shared.configuration
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.shared.configuration.get(name)
    }

    pub fn require_parameter(&self, name: &str) -> Result<&Value, HandlerError> {
        self.parameter(name)
            .ok_or_else(|| HandlerError::MissingParameter {
                name: name.to_string(),
            })
    }

    pub fn log(&self) -> AccessorLog<'_> {
        AccessorLog::new(&self.shared.name)
    }

    /// Start `work` as another unit of this dispatch's isolation scope. Its failure
    /// fails the dispatch. Returns `false` if the scope has already been torn down.
    pub fn spawn<F>(&self, work: F) -> bool
    where
        F: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let work = async move { work.await.map(|()| None) };
        match self.scope.unit(UnitKind::Spawned, work) {
            Some(unit) => {
                self.shared.runtime.spawn(unit);
                true
            }
            None => {
                debug!(
                    accessor = %self.shared.name,
                    port = %self.scope.port(),
                    "Spawn refused, isolation scope already torn down"
                );
                false
            }
        }
    }

    pub fn add_input_handler(&self, port: &str, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_handler(port, Direction::Input, handler)
    }

    pub fn add_output_handler(&self, port: &str, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_handler(port, Direction::Output, handler)
    }

    pub fn add_fire_handler(&self, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        self.shared.registry.add_fire_handler(handler)
    }

    pub fn remove_handler(&self, token: &HandlerToken) -> Result<bool, RegistrationError> {
        self.shared.registry.remove_handler(token)
    }
}

impl std::fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerContext")
            .field("accessor", &self.shared.name)
            .field("scope", &self.scope)
            .finish()
    }
}

/// `log` primitive of the Standard Library Surface
#[derive(Debug, Clone, Copy)]
pub struct AccessorLog<'a> {
    accessor: &'a str,
}

impl<'a> AccessorLog<'a> {
    pub(crate) fn new(accessor: &'a str) -> Self {
        Self { accessor }
    }

    pub fn debug(&self, message: &str) {
        debug!(accessor = self.accessor, "{message}");
    }

    pub fn info(&self, message: &str) {
        info!(accessor = self.accessor, "{message}");
    }

    pub fn warn(&self, message: &str) {
        warn!(accessor = self.accessor, "{message}");
    }

    pub fn error(&self, message: &str) {
        error!(accessor = self.accessor, "{message}");
    }
}
