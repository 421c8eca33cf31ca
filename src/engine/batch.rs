//! Batch executor
//!
//! Runs a bounded batch of independent per-item operations (for example,
//! deleting a list of object keys one request at a time), summing each
//! item's metrics. A failed item does not stop the batch: every item is
//! attempted, and the failures are reported together at the end so the
//! caller can retry exactly that subset.

use crate::engine::metrics::Metrics;
use crate::error::{BatchError, BatchFailure, Error};
use futures::future::BoxFuture;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

/// Largest batch accepted by default
pub const MAX_BATCH_ITEMS: usize = 1000;

pub type ProcessFuture<'a> = BoxFuture<'a, Result<Metrics, Error>>;

/// Runs batches of independent items
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    max_items: usize,
    concurrency: usize,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchExecutor {
    /// Sequential executor accepting up to [`MAX_BATCH_ITEMS`] items
    pub fn new() -> Self {
        Self {
            max_items: MAX_BATCH_ITEMS,
            concurrency: 1,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Number of items kept in flight at once
    ///
    /// Results are still consumed in input order, so the failed-item list
    /// does not depend on this setting.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Attempt every item and sum the metrics of those that succeed
    ///
    /// Cancellation is checked before each item is started; an item already
    /// in flight runs to completion.
    pub async fn run<'a, T, F>(
        &self,
        items: Vec<T>,
        cancel: &CancellationToken,
        mut process: F,
    ) -> Result<Metrics, BatchError<T>>
    where
        F: FnMut(&T) -> ProcessFuture<'a>,
    {
        if items.len() > self.max_items {
            return Err(BatchError::Invalid(Error::config(format!(
                "batch of {} items exceeds the limit of {}",
                items.len(),
                self.max_items
            ))));
        }

        let total = items.len();
        tracing::debug!(
            "Running batch of {} items (concurrency {})",
            total,
            self.concurrency
        );

        let mut outcomes = futures::stream::iter(items)
            .map(|item| {
                let pending = if cancel.is_cancelled() {
                    None
                } else {
                    Some(process(&item))
                };
                async move {
                    match pending {
                        Some(fut) => (item, Some(fut.await)),
                        None => (item, None),
                    }
                }
            })
            .buffered(self.concurrency);

        let mut metrics = Metrics::ZERO;
        let mut failed = Vec::new();
        let mut errors = Vec::new();
        let mut cancelled = false;

        while let Some((item, outcome)) = outcomes.next().await {
            match outcome {
                Some(Ok(cost)) => metrics = metrics.merge(cost),
                Some(Err(err)) => {
                    tracing::warn!("Batch item failed: {}", err);
                    failed.push(item);
                    errors.push(err);
                }
                None => cancelled = true,
            }
        }

        if cancelled {
            tracing::debug!("Batch cancelled");
            return Err(BatchError::Cancelled);
        }

        if failed.is_empty() {
            return Ok(metrics);
        }

        Err(BatchError::Partial(BatchFailure {
            message: format!("{} of {} items failed", failed.len(), total),
            failed,
            errors,
            metrics,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn cost(item: u32) -> Metrics {
        Metrics::class_a(1).with_uploaded(item as u64 * 10)
    }

    /// Fails for the listed items, otherwise charges [`cost`]
    fn failing_on(
        bad: &'static [u32],
        attempts: Arc<Mutex<Vec<u32>>>,
    ) -> impl FnMut(&u32) -> ProcessFuture<'static> {
        move |item| {
            let item = *item;
            let attempts = attempts.clone();
            async move {
                attempts.lock().unwrap().push(item);
                if bad.contains(&item) {
                    Err(Error::transport(format!("item {} failed", item)))
                } else {
                    Ok(cost(item))
                }
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_all_items_succeed() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let metrics = BatchExecutor::new()
            .run(vec![1, 2, 3], &CancellationToken::new(), failing_on(&[], attempts.clone()))
            .await
            .unwrap();
        assert_eq!(metrics, cost(1) + cost(2) + cost(3));
        assert_eq!(*attempts.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_partial_failure_attempts_every_item() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let err = BatchExecutor::new()
            .run(
                vec![1, 2, 3, 4, 5],
                &CancellationToken::new(),
                failing_on(&[2, 4], attempts.clone()),
            )
            .await
            .unwrap_err();

        assert_eq!(*attempts.lock().unwrap(), vec![1, 2, 3, 4, 5]);
        match err {
            BatchError::Partial(failure) => {
                assert_eq!(failure.failed, vec![2, 4]);
                assert_eq!(failure.errors.len(), 2);
                assert_eq!(failure.metrics, cost(1) + cost(3) + cost(5));
                assert_eq!(failure.message, "2 of 5 items failed");
                assert_eq!(
                    failure.cause().unwrap().to_string(),
                    "Transport error: item 2 failed"
                );
            }
            other => panic!("expected partial failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_input_order() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let err = BatchExecutor::new()
            .with_concurrency(4)
            .run(
                (1..=8).collect(),
                &CancellationToken::new(),
                failing_on(&[7, 3], attempts.clone()),
            )
            .await
            .unwrap_err();

        assert_eq!(err.failed(), &[3, 7]);
        let expected: Metrics = [1, 2, 4, 5, 6, 8].into_iter().map(cost).sum();
        assert_eq!(err.metrics(), expected);
        assert_eq!(attempts.lock().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_without_requests() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let err = BatchExecutor::new()
            .with_max_items(2)
            .run(vec![1, 2, 3], &CancellationToken::new(), move |_item: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Metrics::ZERO) }.boxed()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, BatchError::Invalid(Error::Config(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_between_items() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let err = BatchExecutor::new()
            .run(vec![1, 2, 3], &cancel, move |_item: &u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                trigger.cancel();
                async { Ok(Metrics::class_a(1)) }.boxed()
            })
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(err.metrics().is_zero());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let metrics = BatchExecutor::new()
            .run(Vec::<u32>::new(), &CancellationToken::new(), |_item: &u32| {
                async { Ok(Metrics::class_a(1)) }.boxed()
            })
            .await
            .unwrap();
        assert!(metrics.is_zero());
    }
}
