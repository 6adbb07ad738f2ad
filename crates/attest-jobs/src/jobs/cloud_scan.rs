//! Cloud-security scans across every tenant.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use attest_core::enums::{CheckRunStatus, RunStatus};
use attest_core::manifest::{Capability, providers_with};
use attest_core::redact::redact_secrets;
use attest_db::repos::job_run::JobRunFilter;
use attest_db::service::AttestService;
use attest_providers::ScanRequest;

use crate::batch::{BatchSummary, ItemResult, fan_out_batches};
use crate::env::{JobSettings, TaskOptions};
use crate::error::JobError;
use crate::jobs::{CLOUD_SCAN, CLOUD_SCAN_WORKER};
use crate::retry::RetryPolicy;
use crate::scheduler::ScheduledRun;
use crate::task::{Task, TaskContext};

/// Placeholder until the gateway assigns the real check id.
const PENDING_CHECK_ID: &str = "pending";

/// Worker metadata key naming the check run the current attempt opened.
pub const KEY_CHECK_RUN_ID: &str = "check_run_id";

const SCAN_ABANDONED: &str = "scan abandoned: attempt exceeded its max duration";

/// Fail the check run recorded in a worker's metadata if it is still open.
async fn close_open_check_run(
    service: &AttestService,
    metadata: Option<&serde_json::Value>,
) -> Result<bool, JobError> {
    let Some(id) = metadata
        .and_then(|m| m.get(KEY_CHECK_RUN_ID))
        .and_then(serde_json::Value::as_str)
    else {
        return Ok(false);
    };
    if service.get_check_run(id).await?.status != CheckRunStatus::Running {
        return Ok(false);
    }
    service.fail_check_run(id, SCAN_ABANDONED).await?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudScanInput {
    pub connection_id: String,
}

/// Scans one connection and records the outcome as a check run.
pub struct CloudScanWorker {
    options: TaskOptions,
}

impl CloudScanWorker {
    #[must_use]
    pub const fn new(options: TaskOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Task for CloudScanWorker {
    type Input = CloudScanInput;
    type Output = ItemResult;

    fn id(&self) -> &'static str {
        CLOUD_SCAN_WORKER
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(&self, input: &CloudScanInput, ctx: &TaskContext) -> Result<ItemResult, JobError> {
        let service = ctx.service();
        let Some(connection) = service.find_connection(&input.connection_id).await? else {
            return Ok(ItemResult::failed(&input.connection_id, "connection not found"));
        };
        if !connection.is_active() {
            return Ok(ItemResult::failed(&connection.id, "connection is inactive"));
        }
        let scanner = ctx.env().scanner()?;

        let check_run = service.start_check_run(&connection, PENDING_CHECK_ID).await?;
        ctx.metadata().set(KEY_CHECK_RUN_ID, check_run.id.as_str());
        ctx.flush_metadata().await?;
        let request = ScanRequest {
            connection_id: connection.id.clone(),
            organization_id: connection.organization_id.clone(),
            provider: connection.provider.clone(),
        };

        match scanner.scan(&request).await {
            Ok(report) => {
                let passed = i64::try_from(report.passed_count()).unwrap_or(i64::MAX);
                let failed = i64::try_from(report.failed_count()).unwrap_or(i64::MAX);
                let run = service
                    .complete_check_run(&check_run.id, &report.check_id, passed, failed)
                    .await?;
                Ok(ItemResult::ok(
                    &connection.id,
                    Some(serde_json::json!({
                        "check_run_id": run.id,
                        "check_id": run.check_id,
                        "passed": run.passed_count,
                        "failed": run.failed_count,
                    })),
                ))
            }
            Err(e) => {
                let message = redact_secrets(&e.to_string());
                service.fail_check_run(&check_run.id, &message).await?;
                Ok(ItemResult::failed(&connection.id, message))
            }
        }
    }

    async fn on_timeout(&self, _input: &CloudScanInput, ctx: &TaskContext) -> Result<(), JobError> {
        close_open_check_run(ctx.service(), Some(&ctx.metadata().snapshot())).await?;
        Ok(())
    }
}

/// Lists scannable connections and triggers one worker per connection.
pub struct CloudScanOrchestrator {
    batch_size: usize,
    options: TaskOptions,
    worker: CloudScanWorker,
}

impl CloudScanOrchestrator {
    #[must_use]
    pub const fn new(settings: &JobSettings) -> Self {
        Self {
            batch_size: settings.scan_batch_size,
            options: settings.orchestrator,
            worker: CloudScanWorker::new(settings.task),
        }
    }

    #[must_use]
    pub const fn worker(&self) -> &CloudScanWorker {
        &self.worker
    }
}

#[async_trait]
impl Task for CloudScanOrchestrator {
    type Input = ScheduledRun;
    type Output = BatchSummary;

    fn id(&self) -> &'static str {
        CLOUD_SCAN
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.options.retry
    }

    fn max_duration(&self) -> Duration {
        self.options.max_duration
    }

    async fn run(&self, input: &ScheduledRun, ctx: &TaskContext) -> Result<BatchSummary, JobError> {
        ctx.env().scanner()?;
        let providers = providers_with(Capability::SecurityScan);
        let inputs: Vec<CloudScanInput> = ctx
            .service()
            .list_active_connections(&providers)
            .await?
            .into_iter()
            .map(|c| CloudScanInput {
                connection_id: c.id,
            })
            .collect();
        tracing::debug!(connections = inputs.len(), scheduled_at = %input.timestamp, "cloud scan starting");

        let summary = fan_out_batches(inputs, self.batch_size, ctx, |batch| async move {
            let reports = ctx
                .runner()
                .batch_trigger_and_wait(&self.worker, &batch, Some(ctx.run_id()))
                .await;
            batch
                .iter()
                .zip(reports)
                .map(|(item, report)| match report {
                    Ok(report) => report.output,
                    Err(e) => ItemResult::failed(&item.connection_id, e),
                })
                .collect()
        })
        .await?;

        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            batches = summary.batches,
            "cloud scan finished"
        );
        Ok(summary)
    }

    /// Workers dropped with this attempt never reach their own timeout
    /// hook, so close the check runs they opened from their run rows.
    async fn on_timeout(&self, _input: &ScheduledRun, ctx: &TaskContext) -> Result<(), JobError> {
        let service = ctx.service();
        let running = service
            .list_job_runs(&JobRunFilter {
                task_id: Some(CLOUD_SCAN_WORKER.to_string()),
                parent_run_id: Some(ctx.run_id().to_string()),
                status: Some(RunStatus::Running),
                limit: Some(u32::try_from(self.batch_size).unwrap_or(u32::MAX)),
            })
            .await?;
        let mut closed = 0_usize;
        for worker in &running {
            if close_open_check_run(service, worker.metadata.as_ref()).await? {
                closed += 1;
            }
        }
        tracing::warn!(workers = running.len(), check_runs = closed, "cloud scan attempt abandoned");
        Ok(())
    }
}
