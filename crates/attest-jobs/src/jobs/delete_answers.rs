//! Manual answer deletion: the row and its vector mirror.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use attest_core::ids::manual_answer_vector_id;

use crate::batch::{BatchSummary, ItemResult, fan_out_batches};
use crate::env::{JobSettings, TaskOptions};
use crate::error::JobError;
use crate::jobs::{DELETE_MANUAL_ANSWER_BATCH, DELETE_MANUAL_ANSWERS};
use crate::retry::RetryPolicy;
use crate::task::{Task, TaskContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAnswersInput {
    pub organization_id: String,
    /// Every answer of the tenant when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_answer_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBatchInput {
    pub organization_id: String,
    pub manual_answer_ids: Vec<String>,
}

/// Deletes one batch of answers concurrently. Each id yields its own
/// result, in input order.
pub struct DeleteAnswerBatchWorker {
    options: TaskOptions,
}

impl DeleteAnswerBatchWorker {
    #[must_use]
    pub const fn new(options: TaskOptions) -> Self {
        Self { options }
    }

    async fn delete_one(
        ctx: &TaskContext,
        organization_id: &str,
        id: &str,
    ) -> Result<ItemResult, JobError> {
        let service = ctx.service();
        if service.find_manual_answer(organization_id, id).await?.is_none() {
            return Ok(ItemResult::failed(id, "manual answer not found"));
        }
        let vector_id = manual_answer_vector_id(id);
        let removed = ctx
            .env()
            .vectors()?
            .delete(std::slice::from_ref(&vector_id))
            .await?;
        let deleted = service.delete_manual_answer(organization_id, id).await?;
        if !deleted {
            // Removed concurrently between the lookup and the delete.
            return Ok(ItemResult::failed(id, "manual answer not found"));
        }
        Ok(ItemResult::ok(
            id,
            Some(serde_json::json!({ "vector_id": vector_id, "vectors_deleted": removed })),
        ))
    }
}

#[async_trait]
impl Task for DeleteAnswerBatchWorker {
    type Input = DeleteBatchInput;
    type Output = Vec<ItemResult>;

    fn id(&self) -> &'static str {
        DELETE_MANUAL_ANSWER_BATCH
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(
        &self,
        input: &DeleteBatchInput,
        ctx: &TaskContext,
    ) -> Result<Vec<ItemResult>, JobError> {
        ctx.env().vectors()?;
        let results = join_all(input.manual_answer_ids.iter().map(|id| async move {
            match Self::delete_one(ctx, &input.organization_id, id).await {
                Ok(result) => result,
                Err(e) => ItemResult::failed(id, e),
            }
        }))
        .await;
        Ok(results)
    }
}

/// Splits the target ids into batches and runs one worker per batch.
pub struct DeleteAnswersOrchestrator {
    batch_size: usize,
    options: TaskOptions,
    worker: DeleteAnswerBatchWorker,
}

impl DeleteAnswersOrchestrator {
    #[must_use]
    pub const fn new(settings: &JobSettings) -> Self {
        Self {
            batch_size: settings.answer_batch_size,
            options: settings.orchestrator,
            worker: DeleteAnswerBatchWorker::new(settings.task),
        }
    }

    #[must_use]
    pub const fn worker(&self) -> &DeleteAnswerBatchWorker {
        &self.worker
    }
}

/// First occurrence wins.
fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|&id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[async_trait]
impl Task for DeleteAnswersOrchestrator {
    type Input = DeleteAnswersInput;
    type Output = BatchSummary;

    fn id(&self) -> &'static str {
        DELETE_MANUAL_ANSWERS
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(
        &self,
        input: &DeleteAnswersInput,
        ctx: &TaskContext,
    ) -> Result<BatchSummary, JobError> {
        let service = ctx.service();
        service.get_organization(&input.organization_id).await?;
        ctx.env().vectors()?;

        let ids = match &input.manual_answer_ids {
            Some(ids) => dedupe(ids),
            None => service.list_manual_answer_ids(&input.organization_id).await?,
        };
        let organization_id = input.organization_id.as_str();

        let summary = fan_out_batches(ids, self.batch_size, ctx, |batch| async move {
            let child = DeleteBatchInput {
                organization_id: organization_id.to_string(),
                manual_answer_ids: batch,
            };
            let mut reports = ctx
                .runner()
                .batch_trigger_and_wait(&self.worker, std::slice::from_ref(&child), Some(ctx.run_id()))
                .await;
            match reports.pop() {
                Some(Ok(report)) => report.output,
                Some(Err(e)) => {
                    let message = e.to_string();
                    child
                        .manual_answer_ids
                        .iter()
                        .map(|id| ItemResult::failed(id, &message))
                        .collect()
                }
                None => Vec::new(),
            }
        })
        .await?;

        tracing::info!(
            organization_id,
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            batches = summary.batches,
            "manual answer deletion finished"
        );
        Ok(summary)
    }
}
