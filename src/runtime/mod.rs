//! # Accessor Runtime
//!
//! Instantiation and dispatch: everything between a validated description and a
//! live, callable accessor instance.
//!
//! ```text
//! Instantiator ──executes──▶ AccessorBody ──populates──▶ HandlerRegistry
//!      │
//!      └──builds──▶ AccessorInstance ──entry points──▶ Dispatcher
//!                                                        │
//!                                  IsolationScope ◀──────┤ (one per call)
//!                                  Publication   ◀───────┘ (output calls)
//! ```

pub mod body;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod instance;
pub mod instantiator;
pub mod scope;
pub(crate) mod shared;

pub use body::{AccessorBody, BodyScope, PortPlaceholder};
pub use context::{AccessorLog, HandlerContext};
pub use dispatcher::{Completion, DispatchTicket, Dispatcher, PortKey};
pub use handler::{Handler, PortHandler};
pub use instance::{entry_points_for, AccessorInstance, EntryPoint, EntryPointKind, InstanceState};
pub use instantiator::Instantiator;
pub use scope::IsolationScope;
