//! Task declaration and per-attempt context.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use attest_db::service::AttestService;

use crate::env::JobEnv;
use crate::error::JobError;
use crate::metadata::RunMetadata;
use crate::retry::RetryPolicy;
use crate::runner::TaskRunner;

/// A unit of background work the [`TaskRunner`] can trigger.
///
/// `run` borrows its input so the runner can retry without cloning.
/// Returning `Err` fails the attempt and is retried per
/// [`Task::retry_policy`]; per-item failures belong in `Output`.
#[async_trait]
pub trait Task: Send + Sync {
    type Input: Send + Sync;
    type Output: Serialize + Send;

    /// Stable identifier recorded in `job_runs.task_id`.
    fn id(&self) -> &'static str;

    fn retry_policy(&self) -> RetryPolicy;

    /// Upper bound for one attempt.
    fn max_duration(&self) -> Duration;

    async fn run(&self, input: &Self::Input, ctx: &TaskContext) -> Result<Self::Output, JobError>;

    /// Called after an attempt was cut off at [`Task::max_duration`] and
    /// before any retry. Close rows the dropped attempt left open here;
    /// child runs are failed by the runner afterwards.
    async fn on_timeout(&self, _input: &Self::Input, _ctx: &TaskContext) -> Result<(), JobError> {
        Ok(())
    }
}

/// Handed to each attempt. Metadata is shared by every attempt of the run.
pub struct TaskContext {
    pub(crate) run_id: String,
    pub(crate) task_id: &'static str,
    pub(crate) attempt: u32,
    pub(crate) metadata: RunMetadata,
    pub(crate) runner: TaskRunner,
}

impl TaskContext {
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub const fn task_id(&self) -> &'static str {
        self.task_id
    }

    /// 1-based attempt number.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }

    #[must_use]
    pub const fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// Runner for triggering child tasks.
    #[must_use]
    pub const fn runner(&self) -> &TaskRunner {
        &self.runner
    }

    #[must_use]
    pub fn env(&self) -> &Arc<JobEnv> {
        self.runner.env()
    }

    #[must_use]
    pub fn service(&self) -> &AttestService {
        &self.runner.env().service
    }

    /// Persist the current metadata snapshot to the run row.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Database`] if the update fails.
    pub async fn flush_metadata(&self) -> Result<(), JobError> {
        self.service()
            .update_job_run_metadata(&self.run_id, &self.metadata.snapshot())
            .await?;
        Ok(())
    }
}
