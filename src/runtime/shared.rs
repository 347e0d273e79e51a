//! State shared by an accessor instance, its dispatches and its handler contexts.

use crate::config::RuntimeConfig;
use crate::description::{AccessorDescription, Configuration, Direction, PortDeclaration};
use crate::events::Publication;
use crate::registry::HandlerRegistry;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use uuid::Uuid;

pub(crate) struct InstanceShared {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) description: Arc<AccessorDescription>,
    pub(crate) configuration: Configuration,
    pub(crate) registry: HandlerRegistry,
    pub(crate) publication: Publication,
    /// Last value written to each input port
    pub(crate) port_values: RwLock<HashMap<String, Value>>,
    pub(crate) config: RuntimeConfig,
    pub(crate) runtime: Handle,
}

impl InstanceShared {
    pub(crate) fn new(
        description: Arc<AccessorDescription>,
        configuration: Configuration,
        config: RuntimeConfig,
        runtime: Handle,
    ) -> Arc<Self> {
        let id = Uuid::new_v4();
        let name = description.name.clone();
        let registry = HandlerRegistry::new(
            id,
            name.clone(),
            description.ports.iter().map(|port| port.name.clone()),
        );
        let publication = Publication::new(id, name.clone());

        Arc::new(Self {
            id,
            name,
            description,
            configuration,
            registry,
            publication,
            port_values: RwLock::new(HashMap::new()),
            config,
            runtime,
        })
    }

    pub(crate) fn declaration(&self, port: &str) -> Option<&PortDeclaration> {
        self.description.port(port)
    }

    pub(crate) fn declares(&self, port: &str, direction: Direction) -> bool {
        self.declaration(port)
            .is_some_and(|declaration| declaration.has_direction(direction))
    }

    pub(crate) fn bind_input(&self, port: &str, value: Value) {
        self.port_values.write().insert(port.to_string(), value);
    }

    pub(crate) fn input_value(&self, port: &str) -> Option<Value> {
        self.port_values.read().get(port).cloned()
    }
}
