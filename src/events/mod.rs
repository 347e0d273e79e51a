//! # Output Events
//!
//! Delivery of output-port values: the per-instance [`Publication`] registry and the
//! [`PortStream`] adapter used by streaming consumers.

pub mod publication;
pub mod stream;

pub use publication::{Observation, ObserverCallback, ObserverToken, Publication, PublicationStats};
pub use stream::PortStream;
