//! # Body Catalog
//!
//! Handler bodies are compiled into the host and registered here under the identifier
//! that accessor descriptions carry in their `code` field. Instantiation looks the
//! body up by that identifier; nothing is ever compiled or evaluated at run time.

use crate::logging::log_registry_operation;
use crate::runtime::AccessorBody;
use dashmap::DashMap;
use std::sync::Arc;

/// Registered handler bodies keyed by code identifier
#[derive(Default)]
pub struct BodyCatalog {
    bodies: DashMap<String, Arc<dyn AccessorBody>>,
}

impl BodyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` under `code`, returning any body it replaced
    pub fn register<B>(&self, code: impl Into<String>, body: B) -> Option<Arc<dyn AccessorBody>>
    where
        B: AccessorBody + 'static,
    {
        self.register_arc(code, Arc::new(body))
    }

    pub fn register_arc(
        &self,
        code: impl Into<String>,
        body: Arc<dyn AccessorBody>,
    ) -> Option<Arc<dyn AccessorBody>> {
        let code = code.into();
        let previous = self.bodies.insert(code.clone(), body);
        log_registry_operation(
            "register_body",
            "catalog",
            &code,
            if previous.is_some() { "replaced" } else { "registered" },
        );
        previous
    }

    pub fn get(&self, code: &str) -> Option<Arc<dyn AccessorBody>> {
        self.bodies.get(code).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.bodies.contains_key(code)
    }

    pub fn unregister(&self, code: &str) -> bool {
        self.bodies.remove(code).is_some()
    }

    /// Registered identifiers, sorted
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.bodies.iter().map(|e| e.key().clone()).collect();
        codes.sort();
        codes
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl std::fmt::Debug for BodyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyCatalog")
            .field("codes", &self.codes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BodyError;
    use crate::runtime::BodyScope;

    struct Empty;

    impl AccessorBody for Empty {
        fn execute(&self, _scope: &mut BodyScope<'_>) -> Result<(), BodyError> {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let catalog = BodyCatalog::new();
        assert!(catalog.is_empty());

        assert!(catalog.register("display/infocus", Empty).is_none());
        assert!(catalog.register("display/infocus", Empty).is_some());
        catalog.register("lighting/hue/huesingle", Empty);

        assert!(catalog.contains("display/infocus"));
        assert!(catalog.get("lighting/hue/huesingle").is_some());
        assert!(catalog.get("lighting/lifx").is_none());
        assert_eq!(
            catalog.codes(),
            vec!["display/infocus", "lighting/hue/huesingle"]
        );

        assert!(catalog.unregister("display/infocus"));
        assert_eq!(catalog.len(), 1);
    }
}
