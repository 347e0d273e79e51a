//! # Active Accessor Host
//!
//! Keeps named, live accessor instances. Activation fetches a description from a
//! [`DescriptionSource`], instantiates it and records it under a caller-chosen name;
//! deactivation runs the instance's wrapup function and forgets it.

use crate::description::{Configuration, DescriptionSource};
use crate::error::{DispatchResult, HostError};
use crate::logging::log_error;
use crate::runtime::{AccessorInstance, InstanceState, Instantiator};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ActiveAccessor {
    pub name: String,
    pub path: String,
    pub instance: Arc<AccessorInstance>,
    pub activated_at: DateTime<Utc>,
}

/// Listing entry for an active accessor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAccessorSummary {
    pub name: String,
    pub path: String,
    pub accessor: String,
    pub instance_id: Uuid,
    pub state: InstanceState,
    pub activated_at: DateTime<Utc>,
}

pub struct AccessorHost {
    source: Arc<dyn DescriptionSource>,
    instantiator: Instantiator,
    active: DashMap<String, ActiveAccessor>,
    // Names being activated, so concurrent activations of one name cannot both succeed
    activating: Mutex<Vec<String>>,
}

impl AccessorHost {
    pub fn new(source: Arc<dyn DescriptionSource>, instantiator: Instantiator) -> Self {
        Self {
            source,
            instantiator,
            active: DashMap::new(),
            activating: Mutex::new(Vec::new()),
        }
    }

    pub fn instantiator(&self) -> &Instantiator {
        &self.instantiator
    }

    /// Activate the accessor at `path` under `name`
    #[instrument(skip(self, parameters))]
    pub async fn activate(
        &self,
        name: &str,
        path: &str,
        parameters: Configuration,
    ) -> Result<Arc<AccessorInstance>, HostError> {
        self.reserve(name)?;
        let result = self.activate_reserved(name, path, parameters).await;
        self.activating.lock().retain(|pending| pending != name);
        result
    }

    pub fn get(&self, name: &str) -> Option<Arc<AccessorInstance>> {
        self.active.get(name).map(|entry| Arc::clone(&entry.instance))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Active accessors sorted by name
    pub fn list(&self) -> Vec<ActiveAccessorSummary> {
        let mut summaries: Vec<ActiveAccessorSummary> = self
            .active
            .iter()
            .map(|entry| {
                let active = entry.value();
                ActiveAccessorSummary {
                    name: active.name.clone(),
                    path: active.path.clone(),
                    accessor: active.instance.name().to_string(),
                    instance_id: active.instance.id(),
                    state: active.instance.state(),
                    activated_at: active.activated_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Remove `name` and run its wrapup function. The accessor is removed even when
    /// wrapup fails.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, name: &str) -> Result<(), HostError> {
        let (_, active) = self
            .active
            .remove(name)
            .ok_or_else(|| HostError::NotFound {
                name: name.to_string(),
            })?;

        let (sender, receiver) = oneshot::channel::<DispatchResult>();
        let sender = Mutex::new(Some(sender));
        active.instance.wrapup(move |result| {
            if let Some(sender) = sender.lock().take() {
                let _ = sender.send(result);
            }
        });

        match receiver.await {
            Ok(Err(cause)) => {
                log_error("host", "deactivate", &cause.to_string(), Some(name));
                Err(HostError::WrapupFailed {
                    name: name.to_string(),
                    cause,
                })
            }
            _ => {
                info!(name = name, accessor = %active.instance.name(), "Accessor deactivated");
                Ok(())
            }
        }
    }

    fn reserve(&self, name: &str) -> Result<(), HostError> {
        let mut activating = self.activating.lock();
        if self.active.contains_key(name) || activating.iter().any(|pending| pending == name) {
            return Err(HostError::AlreadyActive {
                name: name.to_string(),
            });
        }
        activating.push(name.to_string());
        Ok(())
    }

    async fn activate_reserved(
        &self,
        name: &str,
        path: &str,
        parameters: Configuration,
    ) -> Result<Arc<AccessorInstance>, HostError> {
        let description = self
            .source
            .fetch(path)
            .await
            .map_err(|source| HostError::DescriptionUnavailable {
                path: path.to_string(),
                source,
            })?;

        let instance = self
            .instantiator
            .instantiate(description, parameters)
            .await
            .inspect_err(|err| log_error("host", "activate", &err.to_string(), Some(path)))?;

        match self.active.entry(name.to_string()) {
            Entry::Occupied(_) => Err(HostError::AlreadyActive {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(ActiveAccessor {
                    name: name.to_string(),
                    path: path.to_string(),
                    instance: Arc::clone(&instance),
                    activated_at: Utc::now(),
                });
                info!(name = name, path = path, instance_id = %instance.id(), "Accessor activated");
                Ok(instance)
            }
        }
    }
}

impl std::fmt::Debug for AccessorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessorHost")
            .field("active", &self.list())
            .finish()
    }
}
