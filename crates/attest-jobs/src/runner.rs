//! In-process task runner.
//!
//! Every invocation gets a `job_runs` row. Attempts are bounded by the
//! task's max duration and retried with backoff while the error is
//! retryable and attempts remain.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::Instrument;

use attest_core::redact::redact_secrets;

use crate::env::JobEnv;
use crate::error::JobError;
use crate::metadata::RunMetadata;
use crate::task::{Task, TaskContext};

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<O> {
    pub run_id: String,
    pub task_id: &'static str,
    pub attempts: u32,
    pub output: O,
    /// Final metadata snapshot.
    pub metadata: serde_json::Value,
}

#[derive(Clone)]
pub struct TaskRunner {
    env: Arc<JobEnv>,
}

impl TaskRunner {
    #[must_use]
    pub const fn new(env: Arc<JobEnv>) -> Self {
        Self { env }
    }

    #[must_use]
    pub const fn env(&self) -> &Arc<JobEnv> {
        &self.env
    }

    /// Run `task` once to completion (including retries).
    ///
    /// # Errors
    ///
    /// Returns the last attempt's error once retries are exhausted, or a
    /// database error if the run row cannot be written.
    pub async fn trigger<T: Task>(
        &self,
        task: &T,
        input: T::Input,
    ) -> Result<RunReport<T::Output>, JobError> {
        self.execute(task, &input, None).await
    }

    /// Run `task` as a child of `parent_run_id`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::trigger`].
    pub async fn trigger_child<T: Task>(
        &self,
        task: &T,
        input: &T::Input,
        parent_run_id: &str,
    ) -> Result<RunReport<T::Output>, JobError> {
        self.execute(task, input, Some(parent_run_id)).await
    }

    /// Run one child invocation per input concurrently and wait for all.
    ///
    /// Each child has its own run row and retry budget. Results come back in
    /// input order; one child failing does not cancel its siblings.
    pub async fn batch_trigger_and_wait<T: Task>(
        &self,
        task: &T,
        inputs: &[T::Input],
        parent_run_id: Option<&str>,
    ) -> Vec<Result<RunReport<T::Output>, JobError>> {
        join_all(
            inputs
                .iter()
                .map(|input| self.execute(task, input, parent_run_id)),
        )
        .await
    }

    async fn execute<T: Task>(
        &self,
        task: &T,
        input: &T::Input,
        parent_run_id: Option<&str>,
    ) -> Result<RunReport<T::Output>, JobError> {
        let run = self
            .env
            .service
            .create_job_run(task.id(), parent_run_id)
            .await?;
        let span = tracing::info_span!("task", task_id = task.id(), run_id = %run.id);
        self.attempt_loop(task, input, run.id)
            .instrument(span)
            .await
    }

    async fn attempt_loop<T: Task>(
        &self,
        task: &T,
        input: &T::Input,
        run_id: String,
    ) -> Result<RunReport<T::Output>, JobError> {
        let service = &self.env.service;
        let policy = task.retry_policy();
        let max_duration = task.max_duration();
        let metadata = RunMetadata::new();
        let mut attempt = 1;

        loop {
            service.record_job_attempt(&run_id, attempt).await?;
            let ctx = TaskContext {
                run_id: run_id.clone(),
                task_id: task.id(),
                attempt,
                metadata: metadata.clone(),
                runner: self.clone(),
            };

            let result = match tokio::time::timeout(max_duration, task.run(input, &ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    let timeout = JobError::Timeout {
                        task_id: task.id().to_string(),
                        after: max_duration,
                    };
                    self.abandon_attempt(task, input, &ctx, &timeout).await;
                    Err(timeout)
                }
            }
            .and_then(|output| {
                let value = serde_json::to_value(&output)?;
                Ok((output, value))
            });

            match result {
                Ok((output, value)) => {
                    let snapshot = metadata.snapshot();
                    service.complete_job_run(&run_id, &value, &snapshot).await?;
                    tracing::info!(attempts = attempt, "task completed");
                    return Ok(RunReport {
                        run_id,
                        task_id: task.id(),
                        attempts: attempt,
                        output,
                        metadata: snapshot,
                    });
                }
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        ?delay,
                        error = %redact_secrets(&e.to_string()),
                        "task attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    let message = redact_secrets(&e.to_string());
                    if let Err(db_err) = service
                        .fail_job_run(&run_id, &message, &metadata.snapshot())
                        .await
                    {
                        tracing::warn!(error = %db_err, "failed to record task failure");
                    }
                    tracing::warn!(attempts = attempt, error = %message, "task failed");
                    return Err(e);
                }
            }
        }
    }

    /// Clean up after an attempt dropped by its timeout: the task's own hook
    /// first, then every child run the attempt left `running`.
    async fn abandon_attempt<T: Task>(
        &self,
        task: &T,
        input: &T::Input,
        ctx: &TaskContext,
        timeout: &JobError,
    ) {
        if let Err(e) = task.on_timeout(input, ctx).await {
            tracing::warn!(error = %redact_secrets(&e.to_string()), "timeout cleanup failed");
        }
        let message = redact_secrets(&format!("abandoned: {timeout}"));
        match self
            .env
            .service
            .fail_running_descendants(&ctx.run_id, &message)
            .await
        {
            Ok(0) => {}
            Ok(closed) => tracing::warn!(closed, "closed child runs of a timed-out attempt"),
            Err(e) => tracing::warn!(error = %e, "failed to close child runs of a timed-out attempt"),
        }
    }
}
