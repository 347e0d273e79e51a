#![allow(dead_code)] // Each test binary uses a different subset of the fixtures

pub mod bodies;
pub mod builders;
pub mod strategies;

pub use bodies::*;
pub use builders::*;

use accessor_core::error::DispatchResult;
use std::time::Duration;
use tokio::sync::mpsc;

/// Callback feeding every result into a channel, plus the receiving end
pub fn recording_callback() -> (
    impl Fn(DispatchResult) + Send + Sync + 'static,
    mpsc::UnboundedReceiver<DispatchResult>,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        move |result| {
            let _ = sender.send(result);
        },
        receiver,
    )
}

/// Next result, or `None` if nothing arrives within `ms` milliseconds
pub async fn next_within(
    receiver: &mut mpsc::UnboundedReceiver<DispatchResult>,
    ms: u64,
) -> Option<DispatchResult> {
    tokio::time::timeout(Duration::from_millis(ms), receiver.recv())
        .await
        .ok()
        .flatten()
}

/// Collect exactly `count` results, failing the test if they do not arrive in time
pub async fn collect(
    receiver: &mut mpsc::UnboundedReceiver<DispatchResult>,
    count: usize,
) -> Vec<DispatchResult> {
    let mut results = Vec::with_capacity(count);
    for _ in 0..count {
        match next_within(receiver, 1_000).await {
            Some(result) => results.push(result),
            None => panic!("expected {count} results, got {}", results.len()),
        }
    }
    results
}

pub fn init_test_logging() {
    std::env::set_var("ACCESSOR_ENV", "test");
    accessor_core::logging::init_structured_logging();
}
