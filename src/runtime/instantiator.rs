//! # Accessor Instantiator
//!
//! Turns a description plus a configuration map into a live [`AccessorInstance`].
//!
//! ## Activation sequence
//!
//! 1. Validate the runtime config (`InvalidConfiguration`) and the description
//!    (`MalformedDescription`).
//! 2. Check required parameters and fill defaults (`MissingParameter`).
//! 3. Look up the handler body named by `code` in the [`BodyCatalog`].
//! 4. Build the instance's registry and publication state.
//! 5. Execute the body once against a [`BodyScope`] (`BodyExecutionFailed`).
//! 6. Dispatch `init` and wait for its result (`InitFailed`, which still hands back
//!    the instance).

use super::body::BodyScope;
use super::instance::AccessorInstance;
use super::scope::panic_message;
use super::shared::InstanceShared;
use crate::config::RuntimeConfig;
use crate::description::{AccessorDescription, Configuration};
use crate::error::{BodyError, InstantiationError};
use crate::registry::BodyCatalog;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tracing::{debug, error, info, instrument};

/// Builds accessor instances from descriptions
#[derive(Debug, Clone)]
pub struct Instantiator {
    catalog: Arc<BodyCatalog>,
    config: RuntimeConfig,
}

impl Instantiator {
    pub fn new(catalog: Arc<BodyCatalog>, config: RuntimeConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<BodyCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[instrument(skip_all, fields(accessor = %description.name, code = %description.code))]
    pub async fn instantiate(
        &self,
        description: AccessorDescription,
        configuration: Configuration,
    ) -> Result<Arc<AccessorInstance>, InstantiationError> {
        let started = Instant::now();
        // Fields are public, so a hand-built config may never have been validated
        self.config.validate()?;
        description.validate()?;

        let configuration = configuration.resolve(&description.name, &description.parameters)?;

        let body = self.catalog.get(&description.code).ok_or_else(|| {
            InstantiationError::BodyExecutionFailed {
                accessor: description.name.clone(),
                cause: BodyError::failed(format!(
                    "no handler body registered for code '{}'",
                    description.code
                )),
            }
        })?;

        let runtime = Handle::try_current().map_err(|_| InstantiationError::RuntimeUnavailable {
            accessor: description.name.clone(),
        })?;

        let shared = InstanceShared::new(
            Arc::new(description),
            configuration,
            self.config.clone(),
            runtime,
        );

        let executed = catch_unwind(AssertUnwindSafe(|| {
            let mut scope = BodyScope::new(&shared);
            body.execute(&mut scope)
        }));
        let body_result = match executed {
            Ok(result) => result,
            Err(payload) => Err(BodyError::failed(format!(
                "handler body panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };
        if let Err(cause) = body_result {
            error!(error = %cause, "Handler body execution failed");
            return Err(InstantiationError::BodyExecutionFailed {
                accessor: shared.name.clone(),
                cause,
            });
        }

        debug!(stats = ?shared.registry.stats(), "Handler body executed");

        let instance = Arc::new(AccessorInstance::new(shared));
        if let Err(cause) = instance.run_init().await {
            error!(error = %cause, "Accessor init failed; instance kept for inspection");
            return Err(InstantiationError::InitFailed { instance, cause });
        }

        info!(
            instance_id = %instance.id(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Accessor instantiated"
        );
        Ok(instance)
    }
}
