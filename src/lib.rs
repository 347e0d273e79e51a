#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Accessor Core
//!
//! Execution core for accessors: small device and service modules with declared
//! input and output ports, instantiated and operated uniformly regardless of the
//! device behind them.
//!
//! ## Overview
//!
//! An accessor is described by an [`AccessorDescription`] (its ports, parameters and
//! the identifier of its handler body). The core turns a description plus a
//! configuration map into a live [`AccessorInstance`], then routes calls on the
//! instance's ports through the handlers its body registered.
//!
//! ## Architecture
//!
//! ```text
//! DescriptionSource ─▶ Instantiator ─▶ AccessorInstance
//!                          │                 │
//!                    BodyCatalog        Dispatcher ─▶ IsolationScope
//!                          │                 │
//!                    HandlerRegistry ◀───────┤
//!                                      Publication ─▶ observers / PortStream
//! ```
//!
//! ## Key Features
//!
//! - **Uniform handlers**: immediate and suspending handlers share one future-based
//!   calling convention
//! - **Fan-out dispatch**: every handler bound to a port starts on each call, in
//!   registration order, without waiting for the previous one
//! - **Fault isolation**: failures anywhere in a call's handlers, including after
//!   suspension, come back through the call's completion callback
//! - **Publication**: output values reach the pending read and every observer
//!
//! ## Module Organization
//!
//! - [`description`] - Accessor descriptions, ports and parameters
//! - [`registry`] - Handler registry and body catalog
//! - [`runtime`] - Instantiation, dispatch and the handler surface
//! - [`events`] - Output publication and streaming
//! - [`host`] - Named active accessors
//! - [`config`] - Runtime configuration
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use accessor_core::config::RuntimeConfig;
//! use accessor_core::description::{AccessorDescription, Configuration, PortDeclaration};
//! use accessor_core::error::BodyError;
//! use accessor_core::registry::BodyCatalog;
//! use accessor_core::runtime::{BodyScope, Handler, Instantiator};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(BodyCatalog::new());
//! catalog.register("climate/thermometer", |scope: &mut BodyScope<'_>| -> Result<(), BodyError> {
//!     scope.port("Temperature")?.on_output(Handler::direct("sample", |ctx, _| {
//!         ctx.publish("Temperature", json!(21.5));
//!         Ok(None)
//!     }))?;
//!     Ok(())
//! });
//!
//! let description = AccessorDescription::new("Thermometer", "climate/thermometer")
//!     .with_port(PortDeclaration::output("Temperature"));
//!
//! let instantiator = Instantiator::new(catalog, RuntimeConfig::default());
//! let thermometer = instantiator.instantiate(description, Configuration::new()).await?;
//!
//! assert_eq!(thermometer.read_value("Temperature").await?, Some(json!(21.5)));
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod config;
pub mod constants;
pub mod description;
pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod registry;
pub mod runtime;

pub use config::{RuntimeConfig, RuntimeConfigLoader};
pub use description::{AccessorDescription, Configuration, Direction, PortDeclaration};
pub use error::{
    AccessorError, DispatchFailure, DispatchResult, HandlerError, InstantiationError,
    RegistrationError, Result,
};
pub use events::{ObserverToken, PortStream};
pub use host::AccessorHost;
pub use registry::{BodyCatalog, HandlerToken};
pub use runtime::{AccessorBody, AccessorInstance, BodyScope, Handler, HandlerContext, Instantiator};
