//! # Description Sources
//!
//! Seam to whatever supplies accessor descriptions by path. The production source is
//! the accessor host registry (an HTTP/JSON service living outside this crate); the
//! in-memory source here serves embedding applications and tests.

use super::{AccessorDescription, DescriptionError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Supplier of accessor descriptions keyed by accessor path (e.g. `/lighting/hue/huesingle`)
#[async_trait]
pub trait DescriptionSource: Send + Sync {
    /// Fetch the description served at `path`
    async fn fetch(&self, path: &str) -> Result<AccessorDescription, DescriptionError>;

    /// List every path this source can serve
    async fn list(&self) -> Result<Vec<String>, DescriptionError>;
}

/// Description source backed by a map held in memory
#[derive(Debug, Default)]
pub struct InMemoryDescriptionSource {
    descriptions: RwLock<HashMap<String, AccessorDescription>>,
}

impl InMemoryDescriptionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the description served at `path`
    pub async fn insert(&self, path: impl Into<String>, description: AccessorDescription) {
        let path = path.into();
        debug!(path = %path, accessor = %description.name, "Description source updated");
        self.descriptions.write().await.insert(path, description);
    }

    /// Parse JSON text and serve it at `path`
    pub async fn insert_json(
        &self,
        path: impl Into<String>,
        json: &str,
    ) -> Result<(), DescriptionError> {
        let description = AccessorDescription::from_json(json)?;
        self.insert(path, description).await;
        Ok(())
    }
}

#[async_trait]
impl DescriptionSource for InMemoryDescriptionSource {
    async fn fetch(&self, path: &str) -> Result<AccessorDescription, DescriptionError> {
        self.descriptions
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| DescriptionError::NotFound {
                path: path.to_string(),
            })
    }

    async fn list(&self) -> Result<Vec<String>, DescriptionError> {
        let mut paths: Vec<String> = self.descriptions.read().await.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}
