//! # Registry Infrastructure
//!
//! Registries owned by the runtime.
//!
//! ## Available Registries
//!
//! - **HandlerRegistry**: per-instance (port, direction) → ordered handlers, the fire
//!   list and the init/wrapup slots
//! - **BodyCatalog**: process-wide code identifier → compiled handler body
//!
//! ```text
//! Registry Infrastructure
//! ├── HandlerRegistry   (one per accessor instance)
//! └── BodyCatalog       (shared by every Instantiator)
//! ```

pub mod body_catalog;
pub mod handler_registry;

pub use body_catalog::BodyCatalog;
pub use handler_registry::{
    HandlerKey, HandlerRegistry, HandlerToken, Lifecycle, RegistryStats,
};
