//! # Dispatch Engine
//!
//! Routes one call on a port entry point (or lifecycle slot) through the handlers
//! bound there.
//!
//! ## Flow
//!
//! 1. Resolve the entry point; an undeclared port or direction fails the call with
//!    `UnknownEntryPoint`.
//! 2. Snapshot the handler list. An empty list completes the call at once with no value.
//! 3. Output calls install their completion as the port's pending subscription.
//! 4. One driver task starts every handler in registration order inside a fresh
//!    [`IsolationScope`]. Handlers interleave at their suspension points; none waits
//!    for another.
//! 5. Input and lifecycle calls complete once per finished handler; output calls are
//!    completed by whoever publishes on the port.
//!
//! An optional deadline tears the scope down with `TimedOut`.

use super::context::HandlerContext;
use super::scope::{IsolationScope, Reporting, UnitKind};
use super::shared::InstanceShared;
use crate::constants::{INIT_KEY, WRAPUP_KEY};
use crate::description::Direction;
use crate::error::{DirectionLabel, DispatchFailure, DispatchResult};
use crate::logging::log_dispatch_operation;
use crate::registry::Lifecycle;
use futures::future::join_all;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Completion callback receiving a dispatch result
pub type Completion = Arc<dyn Fn(DispatchResult) + Send + Sync>;

/// Entry point addressed by a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortKey {
    Init,
    Wrapup,
    Port(String),
}

impl PortKey {
    pub fn port(name: impl Into<String>) -> Self {
        Self::Port(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            PortKey::Init => INIT_KEY,
            PortKey::Wrapup => WRAPUP_KEY,
            PortKey::Port(name) => name,
        }
    }

    fn lifecycle(&self) -> Option<Lifecycle> {
        match self {
            PortKey::Init => Some(Lifecycle::Init),
            PortKey::Wrapup => Some(Lifecycle::Wrapup),
            PortKey::Port(_) => None,
        }
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receipt for one dispatch call
#[derive(Debug, Clone)]
pub struct DispatchTicket {
    handlers: usize,
    scope: Option<Arc<IsolationScope>>,
}

impl DispatchTicket {
    pub(crate) fn immediate() -> Self {
        Self {
            handlers: 0,
            scope: None,
        }
    }

    /// Handlers started by the call (the number of completions an input or lifecycle
    /// call produces when nothing fails)
    pub fn handlers(&self) -> usize {
        self.handlers
    }

    /// `false` when the call completed without starting an isolation scope
    pub fn started(&self) -> bool {
        self.scope.is_some()
    }

    /// Wait for every unit of work started by the call to finish, or for the call to fail
    pub async fn settled(&self) {
        if let Some(scope) = &self.scope {
            scope.settled().await;
        }
    }
}

/// Call router for one accessor instance
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<InstanceShared>,
}

impl Dispatcher {
    pub(crate) fn new(shared: Arc<InstanceShared>) -> Self {
        Self { shared }
    }

    /// Dispatch `key` in `direction` (`None` for lifecycle slots) using the configured
    /// dispatch timeout
    pub fn dispatch(
        &self,
        key: PortKey,
        direction: Option<Direction>,
        value: Option<Value>,
        completion: Completion,
    ) -> DispatchTicket {
        let timeout = self.shared.config.dispatch_timeout();
        self.dispatch_with_timeout(key, direction, value, completion, timeout)
    }

    pub(crate) fn dispatch_with_timeout(
        &self,
        key: PortKey,
        direction: Option<Direction>,
        value: Option<Value>,
        completion: Completion,
        timeout: Option<Duration>,
    ) -> DispatchTicket {
        let shared = &self.shared;
        let port = key.to_string();

        let handlers = match (key.lifecycle(), direction) {
            (Some(lifecycle), None) => shared.registry.lifecycle(lifecycle).into_iter().collect(),
            (None, Some(direction)) if shared.declares(&port, direction) => {
                shared.registry.snapshot(&port, direction)
            }
            _ => {
                log_dispatch_operation(&shared.name, &port, direction, 0, "unknown_entry_point");
                completion(Err(DispatchFailure::unknown_entry_point(port, direction)));
                return DispatchTicket::immediate();
            }
        };

        if direction == Some(Direction::Input) {
            if let Some(value) = &value {
                shared.bind_input(&port, value.clone());
            }
        }

        if handlers.is_empty() {
            log_dispatch_operation(&shared.name, &port, direction, 0, "no_handlers");
            completion(Ok(None));
            return DispatchTicket::immediate();
        }

        let reporting = if direction == Some(Direction::Output) {
            Reporting::Publication {
                subscription: shared.publication.register_pending(&port, completion),
            }
        } else {
            Reporting::PerHandler(completion)
        };

        let scope = IsolationScope::new(Arc::clone(shared), port.clone(), direction, reporting);
        let units: Vec<_> = handlers
            .iter()
            .filter_map(|handler| {
                let ctx = HandlerContext::new(Arc::clone(shared), Arc::clone(&scope));
                scope.unit(UnitKind::Handler, handler.invoke(ctx, value.clone()))
            })
            .collect();

        log_dispatch_operation(&shared.name, &port, direction, units.len(), "started");

        let deadline = timeout.map(|timeout| (Instant::now() + timeout, timeout));
        let driver_scope = Arc::clone(&scope);
        let driver_shared = Arc::clone(shared);
        shared.runtime.spawn(async move {
            let scope = driver_scope;
            let run = async {
                join_all(units).await;
                scope.settled().await;
            };
            // Units stay alive until after a timeout failure is delivered
            tokio::pin!(run);

            let Some((deadline, timeout)) = deadline else {
                run.await;
                return;
            };

            let timed_out = || DispatchFailure::TimedOut {
                port: scope.port().to_string(),
                direction: DirectionLabel(scope.direction()),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };

            if tokio::time::timeout_at(deadline, &mut run).await.is_err() {
                scope.fail(timed_out());
                return;
            }

            // Handlers finished but nothing published yet: the read may still be
            // fulfilled until the deadline passes
            if let Some(subscription) = scope.subscription() {
                if driver_shared.publication.is_pending(scope.port(), subscription) {
                    tokio::time::sleep_until(deadline).await;
                    if driver_shared.publication.is_pending(scope.port(), subscription) {
                        scope.fail(timed_out());
                    }
                }
            }
            debug!(port = %scope.port(), "Dispatch driver finished");
        });

        DispatchTicket {
            handlers: handlers.len(),
            scope: Some(scope),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("accessor", &self.shared.name)
            .finish()
    }
}
