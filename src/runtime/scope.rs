//! # Isolation Scope
//!
//! Fault boundary covering one dispatch call's full handler lifetime.
//!
//! Every unit of work started for the call (each handler, plus anything a handler
//! spawns through its context) enters the scope before it starts and reports exactly
//! once when it stops. The scope stays open until every unit has reported, so
//! failures that surface after a handler suspended and resumed are still caught.
//!
//! ## Failure policy
//!
//! The first failure tears the scope down: the remaining units are aborted, the
//! failure is delivered to the caller and every later outcome is discarded.

use super::dispatcher::Completion;
use super::shared::InstanceShared;
use crate::description::Direction;
use crate::error::{DirectionLabel, DispatchFailure, DispatchResult, HandlerError};
use futures::future::{AbortHandle, AbortRegistration, Abortable};
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error};

/// Run a receiver callback, containing any panic it raises. Returns `false` when the
/// callback panicked.
pub(crate) fn call_isolated<F: FnOnce()>(receiver: &str, f: F) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                receiver = receiver,
                panic = %panic_message(payload.as_ref()),
                "Receiver callback panicked; isolated from publisher"
            );
            false
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// How the scope reports to its caller
pub(crate) enum Reporting {
    /// Input and lifecycle dispatches: every handler that finishes completes the caller
    PerHandler(Completion),
    /// Output dispatches: values arrive through publication; failures fulfil the
    /// pending subscription `subscription`
    Publication { subscription: u64 },
}

/// What a unit of work is, for the purpose of reporting its success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
    Handler,
    Spawned,
}

enum Outcome {
    Finished(Option<Value>),
    Failed(DispatchFailure),
    Aborted,
}

struct ScopeState {
    torn_down: bool,
    outstanding: usize,
    aborts: Vec<AbortHandle>,
    completion: Option<Completion>,
}

pub struct IsolationScope {
    shared: Arc<InstanceShared>,
    port: String,
    direction: Option<Direction>,
    subscription: Option<u64>,
    state: Mutex<ScopeState>,
    settled: Notify,
}

impl IsolationScope {
    pub(crate) fn new(
        shared: Arc<InstanceShared>,
        port: impl Into<String>,
        direction: Option<Direction>,
        reporting: Reporting,
    ) -> Arc<Self> {
        let (completion, subscription) = match reporting {
            Reporting::PerHandler(completion) => (Some(completion), None),
            Reporting::Publication { subscription } => (None, Some(subscription)),
        };

        Arc::new(Self {
            shared,
            port: port.into(),
            direction,
            subscription,
            state: Mutex::new(ScopeState {
                torn_down: false,
                outstanding: 0,
                aborts: Vec::new(),
                completion,
            }),
            settled: Notify::new(),
        })
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub(crate) fn subscription(&self) -> Option<u64> {
        self.subscription
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.lock().torn_down
    }

    /// Units still running
    pub fn outstanding(&self) -> usize {
        self.state.lock().outstanding
    }

    /// Enter a unit of work into the scope. The unit is counted immediately; the
    /// returned future runs it and reports its outcome. `None` once torn down.
    pub(crate) fn unit<F>(self: &Arc<Self>, kind: UnitKind, work: F) -> Option<impl Future<Output = ()> + Send + 'static>
    where
        F: Future<Output = Result<Option<Value>, HandlerError>> + Send + 'static,
    {
        let registration = self.enter()?;
        let mut guard = UnitGuard {
            scope: Arc::clone(self),
            reported: false,
        };

        Some(async move {
            let outcome = match Abortable::new(AssertUnwindSafe(work).catch_unwind(), registration).await {
                Err(_aborted) => Outcome::Aborted,
                Ok(Ok(Ok(value))) => Outcome::Finished(value),
                Ok(Ok(Err(cause))) => Outcome::Failed(DispatchFailure::Handler {
                    port: guard.scope.port.clone(),
                    direction: DirectionLabel(guard.scope.direction),
                    cause,
                }),
                Ok(Err(payload)) => Outcome::Failed(DispatchFailure::Panicked {
                    port: guard.scope.port.clone(),
                    direction: DirectionLabel(guard.scope.direction),
                    message: panic_message(payload.as_ref()),
                }),
            };
            guard.reported = true;
            guard.scope.report(kind, outcome);
        })
    }

    /// Tear the scope down with `failure` unless it already was. Returns whether
    /// this call did the teardown.
    pub(crate) fn fail(&self, failure: DispatchFailure) -> bool {
        let (aborts, completion) = {
            let mut state = self.state.lock();
            if state.torn_down {
                debug!(port = %self.port, failure = %failure, "Scope already torn down, failure discarded");
                return false;
            }
            state.torn_down = true;
            (std::mem::take(&mut state.aborts), state.completion.take())
        };

        for handle in aborts {
            handle.abort();
        }
        self.settled.notify_waiters();

        error!(
            accessor = %self.shared.name,
            port = %self.port,
            direction = %DirectionLabel(self.direction),
            failure = %failure,
            "Dispatch failed, isolation scope torn down"
        );
        self.deliver_failure(completion, failure);
        true
    }

    /// Wait until every unit has reported or the scope has been torn down
    pub async fn settled(&self) {
        loop {
            let notified = self.settled.notified();
            {
                let state = self.state.lock();
                if state.torn_down || state.outstanding == 0 {
                    return;
                }
            }
            notified.await;
        }
    }

    fn enter(&self) -> Option<AbortRegistration> {
        let mut state = self.state.lock();
        if state.torn_down {
            return None;
        }
        let (handle, registration) = AbortHandle::new_pair();
        state.aborts.push(handle);
        state.outstanding += 1;
        Some(registration)
    }

    fn report(&self, kind: UnitKind, outcome: Outcome) {
        match outcome {
            Outcome::Failed(failure) => {
                // Tear down before leaving so settling cannot drop the completion first
                self.fail(failure);
                self.leave();
            }
            Outcome::Aborted => {
                self.leave();
            }
            Outcome::Finished(value) => {
                let completion = {
                    let state = self.state.lock();
                    if state.torn_down || kind == UnitKind::Spawned {
                        None
                    } else {
                        state.completion.clone()
                    }
                };
                if let Some(completion) = completion {
                    call_isolated("dispatch completion", || completion(Ok(value)));
                }
                self.leave();
            }
        }
    }

    fn leave(&self) {
        let settled = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_sub(1);
            let settled = state.outstanding == 0 && !state.torn_down;
            if settled {
                state.aborts.clear();
                state.completion = None;
            }
            settled
        };

        if settled {
            debug!(
                accessor = %self.shared.name,
                port = %self.port,
                direction = %DirectionLabel(self.direction),
                "Isolation scope closed"
            );
            self.settled.notify_waiters();
        }
    }

    fn deliver_failure(&self, completion: Option<Completion>, failure: DispatchFailure) {
        if let Some(completion) = completion {
            let result: DispatchResult = Err(failure);
            call_isolated("dispatch completion", || completion(result));
            return;
        }

        if let Some(subscription) = self.subscription {
            let publication = &self.shared.publication;
            if let Some(pending) = publication.withdraw_pending(&self.port, subscription) {
                let result: DispatchResult = Err(failure.clone());
                call_isolated("pending completion", || pending(result));
            }
            publication.publish_failure(&self.port, failure);
        }
    }
}

impl std::fmt::Debug for IsolationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("IsolationScope")
            .field("port", &self.port)
            .field("direction", &self.direction)
            .field("torn_down", &state.torn_down)
            .field("outstanding", &state.outstanding)
            .finish()
    }
}

// Units dropped before reporting (runtime shutdown, deadline) still leave the scope
struct UnitGuard {
    scope: Arc<IsolationScope>,
    reported: bool,
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        if !self.reported {
            self.scope.leave();
        }
    }
}
