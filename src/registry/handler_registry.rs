//! # Handler Registry
//!
//! Per-instance mapping from (port, direction) to the ordered handlers bound there,
//! plus the catch-all fire list and the two lifecycle slots.
//!
//! ## Rules
//!
//! - Insertion order is preserved and is the order handlers are started in.
//! - A handler already present for the exact (port, direction) is rejected.
//! - Only declared ports accept handlers; the fire list is keyed independently.
//! - Dispatch works on a [`HandlerRegistry::snapshot`], so removals during a call do
//!   not affect handlers that call already started.

use crate::constants::{FIRE_KEY, INIT_KEY, WRAPUP_KEY};
use crate::description::Direction;
use crate::error::RegistrationError;
use crate::logging::log_registry_operation;
use crate::runtime::Handler;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};
use uuid::Uuid;

/// Lifecycle slots that bypass per-port lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Init,
    Wrapup,
}

impl Lifecycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifecycle::Init => INIT_KEY,
            Lifecycle::Wrapup => WRAPUP_KEY,
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key a handler was bound under
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HandlerKey {
    Port(String),
    /// The catch-all list run on every input dispatch
    Fire,
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerKey::Port(name) => f.write_str(name),
            HandlerKey::Fire => f.write_str(FIRE_KEY),
        }
    }
}

/// Removal token returned by every successful registration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerToken {
    instance_id: Uuid,
    key: HandlerKey,
    direction: Direction,
    id: u64,
}

impl HandlerToken {
    /// Assemble a token by hand; mostly useful for presenting foreign tokens
    pub fn new(instance_id: Uuid, key: HandlerKey, direction: Direction, id: u64) -> Self {
        Self {
            instance_id,
            key,
            direction,
            id,
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn key(&self) -> &HandlerKey {
        &self.key
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub declared_ports: usize,
    pub input_handlers: usize,
    pub output_handlers: usize,
    pub fire_handlers: usize,
    pub init_defined: bool,
    pub wrapup_defined: bool,
}

struct Entry {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct PortHandlers {
    input: Vec<Entry>,
    output: Vec<Entry>,
}

impl PortHandlers {
    fn list(&self, direction: Direction) -> &Vec<Entry> {
        match direction {
            Direction::Input => &self.input,
            Direction::Output => &self.output,
        }
    }

    fn list_mut(&mut self, direction: Direction) -> &mut Vec<Entry> {
        match direction {
            Direction::Input => &mut self.input,
            Direction::Output => &mut self.output,
        }
    }
}

#[derive(Default)]
struct RegistryState {
    ports: HashMap<String, PortHandlers>,
    fire: Vec<Entry>,
    init: Option<Handler>,
    wrapup: Option<Handler>,
}

/// Handler registry owned by exactly one accessor instance
pub struct HandlerRegistry {
    instance_id: Uuid,
    accessor: String,
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
}

impl HandlerRegistry {
    /// Create an empty registry with one placeholder per declared port
    pub fn new<I, S>(instance_id: Uuid, accessor: impl Into<String>, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ports = ports
            .into_iter()
            .map(|name| (name.into(), PortHandlers::default()))
            .collect();

        Self {
            instance_id,
            accessor: accessor.into(),
            state: RwLock::new(RegistryState {
                ports,
                ..Default::default()
            }),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn is_declared(&self, port: &str) -> bool {
        self.state.read().ports.contains_key(port)
    }

    /// Bind `handler` to (`port`, `direction`)
    pub fn add_handler(
        &self,
        port: &str,
        direction: Direction,
        handler: Handler,
    ) -> Result<HandlerToken, RegistrationError> {
        let mut state = self.state.write();
        let handlers = state
            .ports
            .get_mut(port)
            .ok_or_else(|| RegistrationError::unknown_port(port))?
            .list_mut(direction);

        if handlers.iter().any(|entry| entry.handler.same_as(&handler)) {
            warn!(
                accessor = %self.accessor,
                port = port,
                direction = %direction,
                handler = handler.name(),
                "Rejected duplicate handler registration"
            );
            return Err(RegistrationError::duplicate(port, direction));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(
            accessor = %self.accessor,
            port = port,
            direction = %direction,
            handler = handler.name(),
            position = handlers.len(),
            "Handler registered"
        );
        handlers.push(Entry { id, handler });

        Ok(HandlerToken::new(
            self.instance_id,
            HandlerKey::Port(port.to_string()),
            direction,
            id,
        ))
    }

    /// Append `handler` to the fire list run on every input dispatch.
    ///
    /// Fire handlers run after the port's own handlers, oldest first.
    pub fn add_fire_handler(&self, handler: Handler) -> Result<HandlerToken, RegistrationError> {
        let mut state = self.state.write();
        if state.fire.iter().any(|entry| entry.handler.same_as(&handler)) {
            warn!(
                accessor = %self.accessor,
                handler = handler.name(),
                "Rejected duplicate fire handler"
            );
            return Err(RegistrationError::duplicate(FIRE_KEY, Direction::Input));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        state.fire.push(Entry { id, handler });
        debug!(accessor = %self.accessor, fire_handlers = state.fire.len(), "Fire handler registered");

        Ok(HandlerToken::new(
            self.instance_id,
            HandlerKey::Fire,
            Direction::Input,
            id,
        ))
    }

    /// Remove exactly the handler a token identifies. Returns `false` if it was
    /// already gone.
    pub fn remove_handler(&self, token: &HandlerToken) -> Result<bool, RegistrationError> {
        if token.instance_id != self.instance_id {
            return Err(RegistrationError::malformed_token(
                "token was issued by another accessor instance",
            ));
        }

        let mut state = self.state.write();
        let handlers = match &token.key {
            HandlerKey::Fire if token.direction != Direction::Input => {
                return Err(RegistrationError::malformed_token(
                    "fire handlers are input-only",
                ));
            }
            HandlerKey::Fire => &mut state.fire,
            HandlerKey::Port(port) => state
                .ports
                .get_mut(port)
                .ok_or_else(|| {
                    RegistrationError::malformed_token(format!(
                        "token refers to undeclared port '{port}'"
                    ))
                })?
                .list_mut(token.direction),
        };

        let before = handlers.len();
        handlers.retain(|entry| entry.id != token.id);
        let removed = handlers.len() != before;

        log_registry_operation(
            "remove_handler",
            &self.accessor,
            &token.key.to_string(),
            if removed { "removed" } else { "absent" },
        );
        Ok(removed)
    }

    /// Handlers to start for one dispatch, in start order. Input dispatches run the
    /// port's handlers followed by the fire list.
    pub fn snapshot(&self, port: &str, direction: Direction) -> Vec<Handler> {
        let state = self.state.read();
        let mut handlers: Vec<Handler> = state
            .ports
            .get(port)
            .map(|p| p.list(direction).iter().map(|e| e.handler.clone()).collect())
            .unwrap_or_default();

        if direction == Direction::Input {
            handlers.extend(state.fire.iter().map(|e| e.handler.clone()));
        }
        handlers
    }

    /// Number of handlers bound directly to (`port`, `direction`)
    pub fn handler_count(&self, port: &str, direction: Direction) -> usize {
        self.state
            .read()
            .ports
            .get(port)
            .map_or(0, |p| p.list(direction).len())
    }

    /// Define a lifecycle function, returning the one it replaced
    pub fn define_lifecycle(&self, lifecycle: Lifecycle, handler: Handler) -> Option<Handler> {
        let mut state = self.state.write();
        let slot = match lifecycle {
            Lifecycle::Init => &mut state.init,
            Lifecycle::Wrapup => &mut state.wrapup,
        };
        let previous = slot.replace(handler);
        if previous.is_some() {
            warn!(
                accessor = %self.accessor,
                lifecycle = %lifecycle,
                "Lifecycle function redefined, previous definition replaced"
            );
        }
        previous
    }

    pub fn lifecycle(&self, lifecycle: Lifecycle) -> Option<Handler> {
        let state = self.state.read();
        match lifecycle {
            Lifecycle::Init => state.init.clone(),
            Lifecycle::Wrapup => state.wrapup.clone(),
        }
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.state.read();
        RegistryStats {
            declared_ports: state.ports.len(),
            input_handlers: state.ports.values().map(|p| p.input.len()).sum(),
            output_handlers: state.ports.values().map(|p| p.output.len()).sum(),
            fire_handlers: state.fire.len(),
            init_defined: state.init.is_some(),
            wrapup_defined: state.wrapup.is_some(),
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("instance_id", &self.instance_id)
            .field("accessor", &self.accessor)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HandlerRegistry {
        HandlerRegistry::new(Uuid::new_v4(), "Projector", ["Power", "Input"])
    }

    fn noop(name: &str) -> Handler {
        Handler::direct(name, |_, _| Ok(None))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry();
        let handler = noop("power");

        registry
            .add_handler("Power", Direction::Input, handler.clone())
            .unwrap();
        let err = registry
            .add_handler("Power", Direction::Input, handler.clone())
            .unwrap_err();
        assert_eq!(err, RegistrationError::duplicate("Power", "input"));

        // Same function on another direction or port is a different binding
        assert!(registry
            .add_handler("Power", Direction::Output, handler.clone())
            .is_ok());
        assert!(registry.add_handler("Input", Direction::Input, handler).is_ok());
    }

    #[test]
    fn test_unknown_port_rejected() {
        let registry = registry();
        let err = registry
            .add_handler("Volume", Direction::Input, noop("volume"))
            .unwrap_err();
        assert_eq!(err, RegistrationError::unknown_port("Volume"));
    }

    #[test]
    fn test_snapshot_preserves_insertion_order_and_appends_fire() {
        let registry = registry();
        let first = noop("first");
        let second = noop("second");
        let fire = noop("fire");
        let later_fire = noop("later_fire");

        registry.add_fire_handler(fire.clone()).unwrap();
        registry.add_handler("Power", Direction::Input, first.clone()).unwrap();
        registry.add_handler("Power", Direction::Input, second.clone()).unwrap();
        registry.add_fire_handler(later_fire.clone()).unwrap();

        let snapshot = registry.snapshot("Power", Direction::Input);
        assert_eq!(snapshot.len(), 4);
        assert!(snapshot[0].same_as(&first));
        assert!(snapshot[1].same_as(&second));
        // Oldest fire handler first, regardless of when port handlers were added
        assert!(snapshot[2].same_as(&fire));
        assert!(snapshot[3].same_as(&later_fire));

        // Fire handlers only join input dispatches
        assert!(registry.snapshot("Power", Direction::Output).is_empty());
        // and every input port
        assert_eq!(registry.snapshot("Input", Direction::Input).len(), 2);
    }

    #[test]
    fn test_remove_handler_removes_exact_binding() {
        let registry = registry();
        let handler = noop("power");
        let input_token = registry
            .add_handler("Power", Direction::Input, handler.clone())
            .unwrap();
        registry
            .add_handler("Power", Direction::Output, handler)
            .unwrap();

        assert!(registry.remove_handler(&input_token).unwrap());
        assert_eq!(registry.handler_count("Power", Direction::Input), 0);
        assert_eq!(registry.handler_count("Power", Direction::Output), 1);

        // Second removal is a no-op
        assert!(!registry.remove_handler(&input_token).unwrap());
    }

    #[test]
    fn test_removed_handler_can_be_registered_again() {
        let registry = registry();
        let handler = noop("power");
        let token = registry
            .add_handler("Power", Direction::Input, handler.clone())
            .unwrap();
        registry.remove_handler(&token).unwrap();
        assert!(registry.add_handler("Power", Direction::Input, handler).is_ok());
    }

    #[test]
    fn test_duplicate_fire_rejected_and_removable() {
        let registry = registry();
        let fire = noop("fire");
        let token = registry.add_fire_handler(fire.clone()).unwrap();
        assert_eq!(token.key(), &HandlerKey::Fire);
        assert!(matches!(
            registry.add_fire_handler(fire),
            Err(RegistrationError::DuplicateHandler { .. })
        ));

        assert!(registry.remove_handler(&token).unwrap());
        assert_eq!(registry.stats().fire_handlers, 0);
    }

    #[test]
    fn test_malformed_tokens() {
        let registry = registry();
        let foreign = HandlerToken::new(
            Uuid::new_v4(),
            HandlerKey::Port("Power".to_string()),
            Direction::Input,
            1,
        );
        assert!(matches!(
            registry.remove_handler(&foreign),
            Err(RegistrationError::MalformedToken { .. })
        ));

        let undeclared = HandlerToken::new(
            registry.instance_id(),
            HandlerKey::Port("Volume".to_string()),
            Direction::Input,
            1,
        );
        assert!(matches!(
            registry.remove_handler(&undeclared),
            Err(RegistrationError::MalformedToken { .. })
        ));

        let output_fire = HandlerToken::new(
            registry.instance_id(),
            HandlerKey::Fire,
            Direction::Output,
            1,
        );
        assert!(matches!(
            registry.remove_handler(&output_fire),
            Err(RegistrationError::MalformedToken { .. })
        ));
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_removal() {
        let registry = registry();
        let handler = noop("power");
        let token = registry
            .add_handler("Power", Direction::Input, handler.clone())
            .unwrap();

        let snapshot = registry.snapshot("Power", Direction::Input);
        registry.remove_handler(&token).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot[0].same_as(&handler));
        assert!(registry.snapshot("Power", Direction::Input).is_empty());
    }

    #[test]
    fn test_lifecycle_slots() {
        let registry = registry();
        assert!(registry.lifecycle(Lifecycle::Init).is_none());

        let first = noop("init");
        let second = noop("init2");
        assert!(registry.define_lifecycle(Lifecycle::Init, first.clone()).is_none());
        let replaced = registry
            .define_lifecycle(Lifecycle::Init, second.clone())
            .unwrap();
        assert!(replaced.same_as(&first));
        assert!(registry.lifecycle(Lifecycle::Init).unwrap().same_as(&second));

        let stats = registry.stats();
        assert!(stats.init_defined);
        assert!(!stats.wrapup_defined);
        assert_eq!(stats.declared_ports, 2);
    }
}
