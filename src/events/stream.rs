use super::publication::{Observation, ObserverToken};
use crate::runtime::shared::InstanceShared;
use futures::Stream;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Stream of everything published on one output port.
///
/// Backed by an observer feeding a bounded channel; values published while the
/// buffer is full are dropped. Dropping the stream removes the observer.
pub struct PortStream {
    instance: Weak<InstanceShared>,
    token: ObserverToken,
    receiver: mpsc::Receiver<Observation>,
}

impl PortStream {
    pub(crate) fn new(
        instance: Weak<InstanceShared>,
        token: ObserverToken,
        receiver: mpsc::Receiver<Observation>,
    ) -> Self {
        Self {
            instance,
            token,
            receiver,
        }
    }

    pub fn port(&self) -> &str {
        self.token.port()
    }

    pub fn token(&self) -> &ObserverToken {
        &self.token
    }

    /// Next published value or streamed failure; `None` once the instance is gone
    pub async fn next(&mut self) -> Option<Observation> {
        self.receiver.recv().await
    }
}

impl Stream for PortStream {
    type Item = Observation;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for PortStream {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.upgrade() {
            let removed = instance.publication.unobserve(&self.token).unwrap_or(false);
            debug!(port = %self.token.port(), removed, "Port stream closed");
        }
    }
}

impl std::fmt::Debug for PortStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortStream")
            .field("token", &self.token)
            .finish()
    }
}
