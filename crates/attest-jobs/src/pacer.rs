//! Fixed-rate fan-out for rate-limited providers.
//!
//! Items go out `batch_size` at a time; after each batch except the last the
//! pacer waits `interval`. Because the wait starts once the batch has
//! finished, no interval-long window ever sees more than `batch_size` starts.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    batch_size: usize,
    interval: Duration,
}

impl Pacer {
    /// A zero `batch_size` is treated as 1.
    #[must_use]
    pub fn new(batch_size: usize, interval: Duration) -> Self {
        Self {
            batch_size: batch_size.max(1),
            interval,
        }
    }

    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Apply `f` to every item at the configured pace. Results keep input order.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, f: F) -> Vec<T>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let mut results = Vec::with_capacity(items.len());
        let mut iter = items.into_iter().peekable();
        while iter.peek().is_some() {
            let batch: Vec<I> = iter.by_ref().take(self.batch_size).collect();
            results.extend(join_all(batch.into_iter().map(&f)).await);
            if iter.peek().is_some() {
                tokio::time::sleep(self.interval).await;
            }
        }
        results
    }
}
