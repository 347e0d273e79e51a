//! # Output Publication
//!
//! Per-instance publish/subscribe registry delivering output-port values.
//!
//! Two kinds of receivers exist per port:
//!
//! - **Pending subscription**: one-shot, created by an output dispatch before its
//!   handlers start. At most one per port; a newer output dispatch supersedes it.
//! - **Observers**: long-lived callbacks registered with [`Publication::observe`] and
//!   removed by token, used by streaming consumers.
//!
//! `publish` fulfils the pending subscription (if any) and then hands the same value
//! to every observer in registration order. Receiver panics are caught and logged;
//! the publisher never sees them.

use crate::error::{DispatchFailure, RegistrationError};
use crate::runtime::dispatcher::Completion;
use crate::runtime::scope::call_isolated;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// What observers receive: a value, or a failure surfaced while streaming
pub type Observation = Result<Value, DispatchFailure>;

/// Long-lived observer callback
pub type ObserverCallback = Arc<dyn Fn(Observation) + Send + Sync>;

/// Token identifying one observer registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObserverToken {
    instance_id: Uuid,
    port: String,
    id: u64,
}

impl ObserverToken {
    pub fn new(instance_id: Uuid, port: impl Into<String>, id: u64) -> Self {
        Self {
            instance_id,
            port: port.into(),
            id,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }
}

struct PendingSubscription {
    id: u64,
    completion: Completion,
    created_at: DateTime<Utc>,
}

struct ObserverEntry {
    id: u64,
    callback: ObserverCallback,
}

/// Delivery counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PublicationStats {
    pub published: u64,
    pub pending_fulfilled: u64,
    pub pending_superseded: u64,
    pub observer_deliveries: u64,
    pub receiver_failures: u64,
}

#[derive(Default)]
struct Counters {
    published: AtomicU64,
    pending_fulfilled: AtomicU64,
    pending_superseded: AtomicU64,
    observer_deliveries: AtomicU64,
    receiver_failures: AtomicU64,
}

/// Publication registry owned by one accessor instance
pub struct Publication {
    instance_id: Uuid,
    accessor: String,
    pending: Mutex<HashMap<String, PendingSubscription>>,
    observers: RwLock<HashMap<String, Vec<ObserverEntry>>>,
    next_id: AtomicU64,
    counters: Counters,
}

impl Publication {
    pub fn new(instance_id: Uuid, accessor: impl Into<String>) -> Self {
        Self {
            instance_id,
            accessor: accessor.into(),
            pending: Mutex::new(HashMap::new()),
            observers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    /// Install the one-shot subscription for an output dispatch. A subscription
    /// already pending on the port is displaced and told it was superseded.
    pub fn register_pending(&self, port: &str, completion: Completion) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let displaced = self.pending.lock().insert(
            port.to_string(),
            PendingSubscription {
                id,
                completion,
                created_at: Utc::now(),
            },
        );

        if let Some(displaced) = displaced {
            self.counters
                .pending_superseded
                .fetch_add(1, Ordering::Relaxed);
            info!(
                accessor = %self.accessor,
                port = port,
                waited_ms = (Utc::now() - displaced.created_at).num_milliseconds(),
                "Pending read superseded by a newer read"
            );
            let failure = DispatchFailure::Superseded {
                port: port.to_string(),
            };
            if !call_isolated("superseded completion", || (displaced.completion)(Err(failure))) {
                self.counters.receiver_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        debug!(accessor = %self.accessor, port = port, subscription = id, "Pending subscription registered");
        id
    }

    /// Take back the pending subscription `id` if it is still outstanding
    pub fn withdraw_pending(&self, port: &str, id: u64) -> Option<Completion> {
        let mut pending = self.pending.lock();
        match pending.get(port) {
            Some(subscription) if subscription.id == id => {
                pending.remove(port).map(|subscription| subscription.completion)
            }
            _ => None,
        }
    }

    pub fn has_pending(&self, port: &str) -> bool {
        self.pending.lock().contains_key(port)
    }

    /// Whether subscription `id` is still the outstanding one for `port`
    pub fn is_pending(&self, port: &str, id: u64) -> bool {
        self.pending
            .lock()
            .get(port)
            .is_some_and(|subscription| subscription.id == id)
    }

    /// Register a long-lived observer of `port`
    pub fn observe(&self, port: &str, callback: ObserverCallback) -> ObserverToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .write()
            .entry(port.to_string())
            .or_default()
            .push(ObserverEntry { id, callback });

        debug!(accessor = %self.accessor, port = port, observer = id, "Observer registered");
        ObserverToken::new(self.instance_id, port, id)
    }

    /// Remove the observer a token identifies. Returns `false` if it was already gone.
    pub fn unobserve(&self, token: &ObserverToken) -> Result<bool, RegistrationError> {
        if token.instance_id != self.instance_id {
            return Err(RegistrationError::malformed_token(
                "observer token was issued by another accessor instance",
            ));
        }

        let mut observers = self.observers.write();
        let Some(entries) = observers.get_mut(&token.port) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != token.id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            observers.remove(&token.port);
        }

        debug!(accessor = %self.accessor, port = %token.port, observer = token.id, removed, "Observer removed");
        Ok(removed)
    }

    pub fn observer_count(&self, port: &str) -> usize {
        self.observers.read().get(port).map_or(0, Vec::len)
    }

    /// Deliver `value` to the pending subscription of `port` and to its observers
    pub fn publish(&self, port: &str, value: Value) {
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        let pending = self.pending.lock().remove(port);
        let observers = self.observer_snapshot(port);

        debug!(
            accessor = %self.accessor,
            port = port,
            pending = pending.is_some(),
            observers = observers.len(),
            "Publishing output value"
        );

        if let Some(subscription) = pending {
            self.counters
                .pending_fulfilled
                .fetch_add(1, Ordering::Relaxed);
            let value = value.clone();
            if !call_isolated("pending completion", || (subscription.completion)(Ok(Some(value)))) {
                self.counters.receiver_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        self.notify_observers(&observers, Ok(value));
    }

    /// Report a failure to the observers of `port`
    pub fn publish_failure(&self, port: &str, failure: DispatchFailure) {
        let observers = self.observer_snapshot(port);
        self.notify_observers(&observers, Err(failure));
    }

    pub fn stats(&self) -> PublicationStats {
        PublicationStats {
            published: self.counters.published.load(Ordering::Relaxed),
            pending_fulfilled: self.counters.pending_fulfilled.load(Ordering::Relaxed),
            pending_superseded: self.counters.pending_superseded.load(Ordering::Relaxed),
            observer_deliveries: self.counters.observer_deliveries.load(Ordering::Relaxed),
            receiver_failures: self.counters.receiver_failures.load(Ordering::Relaxed),
        }
    }

    // Callbacks run without any lock held so they may observe or unobserve freely
    fn observer_snapshot(&self, port: &str) -> Vec<ObserverCallback> {
        self.observers
            .read()
            .get(port)
            .map(|entries| entries.iter().map(|e| Arc::clone(&e.callback)).collect())
            .unwrap_or_default()
    }

    fn notify_observers(&self, observers: &[ObserverCallback], observation: Observation) {
        for callback in observers {
            let observation = observation.clone();
            self.counters
                .observer_deliveries
                .fetch_add(1, Ordering::Relaxed);
            if !call_isolated("observer", || callback(observation)) {
                self.counters.receiver_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl std::fmt::Debug for Publication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publication")
            .field("instance_id", &self.instance_id)
            .field("accessor", &self.accessor)
            .field("stats", &self.stats())
            .finish()
    }
}
