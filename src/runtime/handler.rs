//! # Port Handlers
//!
//! A handler is a function bound to a (port, direction) pair. Handlers come in two
//! shapes: *direct* handlers produce their result as soon as they are called, while
//! *suspending* handlers await sub-operations (typically outbound device requests)
//! before producing it.
//!
//! The dispatch engine never looks at the shape. Every handler is invoked through
//! [`Handler::invoke`], which always yields a boxed future; a direct handler's future
//! simply completes on its first poll.
//!
//! ## Identity
//!
//! Two [`Handler`] values are the same handler when they share the same allocation,
//! i.e. one is a clone of the other. Registering a clone of an already registered
//! handler for the same (port, direction) is a duplicate.
//!
//! ```rust
//! use accessor_core::runtime::Handler;
//! use serde_json::json;
//!
//! let on_power = Handler::direct("power", |ctx, value| {
//!     ctx.log().info(&format!("power -> {value:?}"));
//!     Ok(Some(json!(true)))
//! });
//! let same = on_power.clone();
//! assert!(on_power.same_as(&same));
//! ```

use super::context::HandlerContext;
use crate::error::HandlerResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Behaviour bound to a port direction or lifecycle slot
#[async_trait]
pub trait PortHandler: Send + Sync {
    /// Handle one dispatch. `value` is the written value for inputs and `None` otherwise.
    async fn handle(&self, ctx: HandlerContext, value: Option<Value>) -> HandlerResult;

    /// Name used in logs
    fn name(&self) -> &str {
        "anonymous_handler"
    }
}

/// Shared, identity-comparable handle to a [`PortHandler`]
#[derive(Clone)]
pub struct Handler {
    inner: Arc<dyn PortHandler>,
}

impl Handler {
    pub fn new<H>(handler: H) -> Self
    where
        H: PortHandler + 'static,
    {
        Self {
            inner: Arc::new(handler),
        }
    }

    pub fn from_arc(inner: Arc<dyn PortHandler>) -> Self {
        Self { inner }
    }

    /// Handler that returns its result immediately
    pub fn direct<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerContext, Option<Value>) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(DirectHandler {
            name: name.into(),
            f,
        })
    }

    /// Handler that may suspend before producing its result
    pub fn suspending<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(HandlerContext, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(SuspendingHandler {
            name: name.into(),
            f,
        })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Identity comparison
    pub fn same_as(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }

    /// Produce the handler's future. Nothing runs until the future is first polled,
    /// so a panic in a direct handler is raised inside whatever polls it.
    pub(crate) fn invoke(&self, ctx: HandlerContext, value: Option<Value>) -> BoxFuture<'static, HandlerResult> {
        let inner = Arc::clone(&self.inner);
        async move { inner.handle(ctx, value).await }.boxed()
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name())
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

struct DirectHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> PortHandler for DirectHandler<F>
where
    F: Fn(&HandlerContext, Option<Value>) -> HandlerResult + Send + Sync + 'static,
{
    async fn handle(&self, ctx: HandlerContext, value: Option<Value>) -> HandlerResult {
        (self.f)(&ctx, value)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct SuspendingHandler<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F, Fut> PortHandler for SuspendingHandler<F>
where
    F: Fn(HandlerContext, Option<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, ctx: HandlerContext, value: Option<Value>) -> HandlerResult {
        (self.f)(ctx, value).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
