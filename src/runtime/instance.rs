//! # Accessor Instances
//!
//! One live, isolated accessor: its configuration, handler registry and publication
//! registry, plus the callable surface built from its description.
//!
//! ## Entry points
//!
//! | Port declares | Entry points                                  |
//! |---------------|-----------------------------------------------|
//! | `output`      | `read`, `observe`/`unobserve`, `subscribe`    |
//! | `input`       | `write`                                       |
//! | (always)      | `init`, `wrapup`                              |
//!
//! Callbacks receive a [`DispatchResult`]. Input and lifecycle calls complete once
//! per handler that ran; output calls complete when a handler publishes.

use super::dispatcher::{Completion, DispatchTicket, Dispatcher, PortKey};
use super::shared::InstanceShared;
use crate::config::RuntimeConfig;
use crate::description::{AccessorDescription, Configuration, Direction};
use crate::error::{DispatchFailure, DispatchResult, HandlerError, RegistrationError};
use crate::events::{Observation, ObserverToken, PortStream, Publication};
use crate::registry::HandlerRegistry;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use uuid::Uuid;

/// Lifecycle state of an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Body executed, init not yet completed
    Created,
    Ready,
    InitFailed,
    WrappedUp,
}

/// Kind of entry point exposed by an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPointKind {
    Read,
    Write,
    Subscribe,
    Init,
    Wrapup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub port: String,
    pub kind: EntryPointKind,
}

/// The callable surface a description produces, in port declaration order
pub fn entry_points_for(description: &AccessorDescription) -> Vec<EntryPoint> {
    let mut entry_points = Vec::new();
    for port in &description.ports {
        if port.has_direction(Direction::Output) {
            entry_points.push(EntryPoint {
                port: port.name.clone(),
                kind: EntryPointKind::Read,
            });
            entry_points.push(EntryPoint {
                port: port.name.clone(),
                kind: EntryPointKind::Subscribe,
            });
        }
        if port.has_direction(Direction::Input) {
            entry_points.push(EntryPoint {
                port: port.name.clone(),
                kind: EntryPointKind::Write,
            });
        }
    }
    entry_points.push(EntryPoint {
        port: PortKey::Init.to_string(),
        kind: EntryPointKind::Init,
    });
    entry_points.push(EntryPoint {
        port: PortKey::Wrapup.to_string(),
        kind: EntryPointKind::Wrapup,
    });
    entry_points
}

pub struct AccessorInstance {
    shared: Arc<InstanceShared>,
    dispatcher: Dispatcher,
    state: Arc<Mutex<InstanceState>>,
    init_invoked: AtomicBool,
    wrapup_invoked: AtomicBool,
}

impl AccessorInstance {
    pub(crate) fn new(shared: Arc<InstanceShared>) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&shared)),
            shared,
            state: Arc::new(Mutex::new(InstanceState::Created)),
            init_invoked: AtomicBool::new(false),
            wrapup_invoked: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn description(&self) -> &AccessorDescription {
        &self.shared.description
    }

    pub fn configuration(&self) -> &Configuration {
        &self.shared.configuration
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.shared.config
    }

    pub fn state(&self) -> InstanceState {
        *self.state.lock()
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.shared.registry
    }

    pub fn publication(&self) -> &Publication {
        &self.shared.publication
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn entry_points(&self) -> Vec<EntryPoint> {
        entry_points_for(&self.shared.description)
    }

    /// Value most recently written to input `port`
    pub fn input_value(&self, port: &str) -> Option<Value> {
        self.shared.input_value(port)
    }

    /// Read output `port`. The callback fires when a handler publishes on the port.
    pub fn read<F>(&self, port: &str, callback: F) -> DispatchTicket
    where
        F: Fn(DispatchResult) + Send + Sync + 'static,
    {
        self.dispatcher.dispatch(
            PortKey::port(port),
            Some(Direction::Output),
            None,
            Arc::new(callback),
        )
    }

    /// Write `value` to input `port`. The callback fires once per handler that ran.
    pub fn write<F>(&self, port: &str, value: impl Into<Value>, callback: F) -> DispatchTicket
    where
        F: Fn(DispatchResult) + Send + Sync + 'static,
    {
        self.dispatcher.dispatch(
            PortKey::port(port),
            Some(Direction::Input),
            Some(value.into()),
            Arc::new(callback),
        )
    }

    /// Register a long-lived observer of output `port`
    pub fn observe<F>(&self, port: &str, callback: F) -> Result<ObserverToken, DispatchFailure>
    where
        F: Fn(Observation) + Send + Sync + 'static,
    {
        self.ensure_output(port)?;
        Ok(self.shared.publication.observe(port, Arc::new(callback)))
    }

    pub fn unobserve(&self, token: &ObserverToken) -> Result<bool, RegistrationError> {
        self.shared.publication.unobserve(token)
    }

    /// Stream every value published on output `port` until the stream is dropped
    pub fn subscribe(&self, port: &str) -> Result<PortStream, DispatchFailure> {
        self.ensure_output(port)?;
        let (sender, receiver) = mpsc::channel(self.shared.config.observer_channel_capacity);
        let accessor = self.shared.name.clone();
        let stream_port = port.to_string();
        let token = self.shared.publication.observe(
            port,
            Arc::new(move |observation| {
                if let Err(mpsc::error::TrySendError::Full(_)) = sender.try_send(observation) {
                    tracing::warn!(
                        accessor = %accessor,
                        port = %stream_port,
                        "Subscriber buffer full, dropping published value"
                    );
                }
            }),
        );
        Ok(PortStream::new(Arc::downgrade(&self.shared), token, receiver))
    }

    /// Dispatch the init lifecycle function
    pub fn init<F>(&self, callback: F) -> DispatchTicket
    where
        F: Fn(DispatchResult) + Send + Sync + 'static,
    {
        let timeout = self.shared.config.init_timeout();
        self.lifecycle(PortKey::Init, Arc::new(callback), timeout)
    }

    /// Dispatch the wrapup lifecycle function
    pub fn wrapup<F>(&self, callback: F) -> DispatchTicket
    where
        F: Fn(DispatchResult) + Send + Sync + 'static,
    {
        let timeout = self.shared.config.dispatch_timeout();
        self.lifecycle(PortKey::Wrapup, Arc::new(callback), timeout)
    }

    /// Read output `port` and wait for the published value
    pub async fn read_value(&self, port: &str) -> DispatchResult {
        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        self.read(port, move |result| {
            if let Some(sender) = sender.lock().take() {
                let _ = sender.send(result);
            }
        });
        receiver.await.unwrap_or_else(|_| Err(dropped(port)))
    }

    /// Write `value` to input `port` and collect one result per handler, stopping at
    /// the first failure
    pub async fn write_value(&self, port: &str, value: impl Into<Value>) -> Vec<DispatchResult> {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let ticket = self.write(port, value, move |result| {
            let _ = sender.send(result);
        });

        let expected = ticket.handlers().max(1);
        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match receiver.recv().await {
                Some(result) => {
                    let failed = result.is_err();
                    results.push(result);
                    if failed {
                        break;
                    }
                }
                None => break,
            }
        }
        results
    }

    /// Await the single init completion
    pub(crate) async fn run_init(&self) -> DispatchResult {
        let (sender, receiver) = oneshot::channel();
        let sender = Mutex::new(Some(sender));
        self.init(move |result| {
            if let Some(sender) = sender.lock().take() {
                let _ = sender.send(result);
            }
        });
        receiver
            .await
            .unwrap_or_else(|_| Err(dropped(PortKey::Init.as_str())))
    }

    fn lifecycle(
        &self,
        key: PortKey,
        callback: Completion,
        timeout: Option<std::time::Duration>,
    ) -> DispatchTicket {
        let (flag, ok_state, failed_state) = match key {
            PortKey::Init => (&self.init_invoked, InstanceState::Ready, InstanceState::InitFailed),
            _ => (&self.wrapup_invoked, InstanceState::WrappedUp, InstanceState::WrappedUp),
        };

        if flag.swap(true, Ordering::SeqCst) {
            callback(Err(DispatchFailure::AlreadyInvoked {
                port: key.to_string(),
            }));
            return DispatchTicket::immediate();
        }

        info!(accessor = %self.shared.name, lifecycle = %key, "Dispatching lifecycle function");
        let state = Arc::clone(&self.state);
        let completion: Completion = Arc::new(move |result: DispatchResult| {
            *state.lock() = if result.is_ok() { ok_state } else { failed_state };
            callback(result);
        });
        self.dispatcher
            .dispatch_with_timeout(key, None, None, completion, timeout)
    }

    fn ensure_output(&self, port: &str) -> Result<(), DispatchFailure> {
        if self.shared.declares(port, Direction::Output) {
            Ok(())
        } else {
            Err(DispatchFailure::unknown_entry_point(port, Some(Direction::Output)))
        }
    }
}

fn dropped(port: &str) -> DispatchFailure {
    DispatchFailure::Handler {
        port: port.to_string(),
        direction: crate::error::DirectionLabel(None),
        cause: HandlerError::failed("dispatch ended without completing"),
    }
}

impl fmt::Debug for AccessorInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessorInstance")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("registry", &self.shared.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::PortDeclaration;

    #[test]
    fn test_entry_points_follow_declared_directions() {
        let description = AccessorDescription::new("Hue", "lighting/hue/huesingle")
            .with_port(PortDeclaration::input("Power"))
            .with_port(PortDeclaration::new(
                "Brightness",
                &[Direction::Input, Direction::Output],
            ));

        let kinds: Vec<(String, EntryPointKind)> = entry_points_for(&description)
            .into_iter()
            .map(|entry| (entry.port, entry.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("Power".to_string(), EntryPointKind::Write),
                ("Brightness".to_string(), EntryPointKind::Read),
                ("Brightness".to_string(), EntryPointKind::Subscribe),
                ("Brightness".to_string(), EntryPointKind::Write),
                ("init".to_string(), EntryPointKind::Init),
                ("wrapup".to_string(), EntryPointKind::Wrapup),
            ]
        );
    }
}
