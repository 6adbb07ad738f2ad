//! Batch fan-out with partial-failure tallies.
//!
//! Batches run one after another; items inside a batch run concurrently
//! with no ordering guarantee. A failed item never stops its batch or the
//! batches after it. Progress lands in the run metadata under
//! `total`, `completed`, `failed`, `current_batch` and `total_batches`, and
//! is flushed to the run row after every batch.

use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use attest_core::redact::redact_secrets;

use crate::error::JobError;
use crate::metadata::{KEY_COMPLETED, KEY_CURRENT_BATCH, KEY_FAILED, KEY_TOTAL, KEY_TOTAL_BATCHES};
use crate::task::TaskContext;

/// Tagged outcome of one work item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    #[must_use]
    pub fn ok(id: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            id: id.into(),
            success: true,
            data,
            error: None,
        }
    }

    /// Failure with a redacted message.
    #[must_use]
    pub fn failed(id: impl Into<String>, error: impl Display) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(redact_secrets(&error.to_string())),
        }
    }
}

/// Aggregate of a fan-out, returned by orchestrators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub batches: usize,
    /// Failed items, in the order they were recorded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ItemResult>,
}

/// Running tally of item results.
#[derive(Debug, Clone, Default)]
pub struct BatchTally {
    summary: BatchSummary,
}

impl BatchTally {
    #[must_use]
    pub fn new(total: usize, batches: usize) -> Self {
        Self {
            summary: BatchSummary {
                total,
                batches,
                ..Default::default()
            },
        }
    }

    /// Fold one result in. Never short-circuits.
    pub fn record(&mut self, result: ItemResult) {
        if result.success {
            self.summary.succeeded += 1;
        } else {
            self.summary.failed += 1;
            self.summary.failures.push(result);
        }
    }

    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.summary.succeeded
    }

    #[must_use]
    pub const fn failed(&self) -> usize {
        self.summary.failed
    }

    #[must_use]
    pub fn finish(self) -> BatchSummary {
        self.summary
    }
}

/// Number of batches of `size` needed for `items`: `ceil(items / size)`.
///
/// # Errors
///
/// Returns [`JobError::InvalidInput`] when `size` is zero.
pub fn batch_count(items: usize, size: usize) -> Result<usize, JobError> {
    if size == 0 {
        return Err(zero_batch_size());
    }
    Ok(items.div_ceil(size))
}

/// Split `items` into owned chunks of at most `size`.
///
/// # Errors
///
/// Returns [`JobError::InvalidInput`] when `size` is zero.
pub fn into_batches<I>(items: Vec<I>, size: usize) -> Result<Vec<Vec<I>>, JobError> {
    let count = batch_count(items.len(), size)?;
    let mut batches = Vec::with_capacity(count);
    let mut iter = items.into_iter();
    loop {
        let batch: Vec<I> = iter.by_ref().take(size).collect();
        if batch.is_empty() {
            break;
        }
        batches.push(batch);
    }
    Ok(batches)
}

fn zero_batch_size() -> JobError {
    JobError::InvalidInput("batch size must be at least 1".into())
}

fn init_progress(ctx: &TaskContext, total: usize, batches: usize) {
    let meta = ctx.metadata();
    meta.set(KEY_TOTAL, total);
    meta.set(KEY_TOTAL_BATCHES, batches);
    meta.set(KEY_COMPLETED, 0);
    meta.set(KEY_FAILED, 0);
    meta.set(KEY_CURRENT_BATCH, 0);
}

fn count(ctx: &TaskContext, result: &ItemResult) {
    if result.success {
        ctx.metadata().increment(KEY_COMPLETED, 1);
    } else {
        tracing::warn!(
            task_id = ctx.task_id(),
            item = %result.id,
            error = result.error.as_deref().unwrap_or_default(),
            "item failed"
        );
        ctx.metadata().increment(KEY_FAILED, 1);
    }
}

/// Run `worker` over every item, `size` items at a time.
///
/// Metadata counters move as each item finishes.
///
/// # Errors
///
/// Returns [`JobError::InvalidInput`] for a zero batch size, or
/// [`JobError::Database`] if metadata cannot be flushed.
pub async fn fan_out<I, F, Fut>(
    items: Vec<I>,
    size: usize,
    ctx: &TaskContext,
    worker: F,
) -> Result<BatchSummary, JobError>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = ItemResult>,
{
    let total = items.len();
    let batches = into_batches(items, size)?;
    let batch_total = batches.len();
    init_progress(ctx, total, batch_total);
    ctx.flush_metadata().await?;

    let mut tally = BatchTally::new(total, batch_total);
    for (index, batch) in batches.into_iter().enumerate() {
        ctx.metadata().set(KEY_CURRENT_BATCH, index + 1);
        let results = join_all(batch.into_iter().map(|item| {
            let fut = worker(item);
            async move {
                let result = fut.await;
                count(ctx, &result);
                result
            }
        }))
        .await;
        for result in results {
            tally.record(result);
        }
        ctx.flush_metadata().await?;
        tracing::debug!(
            batch = index + 1,
            of = batch_total,
            succeeded = tally.succeeded(),
            failed = tally.failed(),
            "batch finished"
        );
    }
    Ok(tally.finish())
}

/// Hand each batch to `dispatch` as a whole and tally what it returns.
///
/// `dispatch` must return one result per item; counters move when the
/// batch finishes.
///
/// # Errors
///
/// Returns [`JobError::InvalidInput`] for a zero batch size, or
/// [`JobError::Database`] if metadata cannot be flushed.
pub async fn fan_out_batches<I, F, Fut>(
    items: Vec<I>,
    size: usize,
    ctx: &TaskContext,
    dispatch: F,
) -> Result<BatchSummary, JobError>
where
    F: Fn(Vec<I>) -> Fut,
    Fut: Future<Output = Vec<ItemResult>>,
{
    let total = items.len();
    let batches = into_batches(items, size)?;
    let batch_total = batches.len();
    init_progress(ctx, total, batch_total);
    ctx.flush_metadata().await?;

    let mut tally = BatchTally::new(total, batch_total);
    for (index, batch) in batches.into_iter().enumerate() {
        ctx.metadata().set(KEY_CURRENT_BATCH, index + 1);
        for result in dispatch(batch).await {
            count(ctx, &result);
            tally.record(result);
        }
        ctx.flush_metadata().await?;
        tracing::debug!(
            batch = index + 1,
            of = batch_total,
            succeeded = tally.succeeded(),
            failed = tally.failed(),
            "batch finished"
        );
    }
    Ok(tally.finish())
}
