//! Batched Dashboard calls.
//!
//! The Dashboard rate-limits per organization, so fan-out is done in small
//! fixed-size groups with a pause between groups. Results come back in input
//! order and per-call failures stay inline.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::CoreError;

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub max_concurrent: usize,
    pub delay: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl BatchConfig {
    fn group_size(self) -> usize {
        self.max_concurrent.max(1)
    }
}

/// Run blocking calls on the blocking pool, `max_concurrent` at a time.
///
/// A call that panics is reported as [`CoreError::Internal`] in its slot.
pub async fn batch_calls<T, E, F>(calls: Vec<F>, config: BatchConfig) -> Vec<Result<T, CoreError>>
where
    F: FnOnce() -> Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<CoreError> + Send + 'static,
{
    let total = calls.len();
    let size = config.group_size();
    let mut results = Vec::with_capacity(total);
    let mut calls = calls.into_iter().peekable();
    let mut group_index = 0_usize;

    while calls.peek().is_some() {
        let handles: Vec<_> = calls
            .by_ref()
            .take(size)
            .map(tokio::task::spawn_blocking)
            .collect();

        for outcome in join_all(handles).await {
            results.push(match outcome {
                Ok(result) => result.map_err(Into::into),
                Err(join) => {
                    warn!(error = %join, "batched call panicked");
                    Err(CoreError::Internal(format!("batched call failed: {join}")))
                }
            });
        }

        group_index += 1;
        if calls.peek().is_some() && !config.delay.is_zero() {
            debug!(
                group = group_index,
                done = results.len(),
                total,
                "pausing between batches"
            );
            tokio::time::sleep(config.delay).await;
        }
    }

    results
}

/// Async counterpart of [`batch_calls`]: each group's futures are awaited
/// together, with the same pause between groups.
pub async fn batch_async<T, Fut>(futures: Vec<Fut>, config: BatchConfig) -> Vec<T>
where
    Fut: Future<Output = T>,
{
    let size = config.group_size();
    let mut results = Vec::with_capacity(futures.len());
    let mut futures = futures.into_iter().peekable();

    while futures.peek().is_some() {
        let group: Vec<Fut> = futures.by_ref().take(size).collect();
        results.extend(join_all(group).await);

        if futures.peek().is_some() && !config.delay.is_zero() {
            tokio::time::sleep(config.delay).await;
        }
    }

    results
}
