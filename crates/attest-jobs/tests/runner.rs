//! Retry, timeout and run-row bookkeeping of the task runner.

mod common;

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use attest_core::enums::RunStatus;
use attest_db::repos::job_run::JobRunFilter;
use attest_jobs::{ItemResult, JobEnv, JobError, RetryPolicy, Task, TaskContext};

use common::{fast_options, runner, service};

/// Fails with an infrastructure error until `succeed_on` is reached.
struct Flaky {
    succeed_on: u32,
    max_attempts: u32,
    calls: AtomicU32,
}

impl Flaky {
    fn new(succeed_on: u32, max_attempts: u32) -> Self {
        Self {
            succeed_on,
            max_attempts,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Task for Flaky {
    type Input = ();
    type Output = u32;

    fn id(&self) -> &'static str {
        "flaky"
    }

    fn retry_policy(&self) -> RetryPolicy {
        fast_options().retry.with_max_attempts(self.max_attempts)
    }

    fn max_duration(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn run(&self, _input: &(), ctx: &TaskContext) -> Result<u32, JobError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ctx.metadata().increment("attempts_seen", 1);
        if ctx.attempt() < self.succeed_on {
            return Err(anyhow::anyhow!("upstream unavailable").into());
        }
        Ok(ctx.attempt())
    }
}

/// Always returns a tagged failure.
struct Tagged {
    calls: AtomicU32,
}

#[async_trait]
impl Task for Tagged {
    type Input = String;
    type Output = ItemResult;

    fn id(&self) -> &'static str {
        "tagged"
    }

    fn retry_policy(&self) -> RetryPolicy {
        fast_options().retry.with_max_attempts(5)
    }

    fn max_duration(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn run(&self, input: &String, _ctx: &TaskContext) -> Result<ItemResult, JobError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ItemResult::failed(input, "connection is inactive"))
    }
}

struct Slow;

#[async_trait]
impl Task for Slow {
    type Input = ();
    type Output = ();

    fn id(&self) -> &'static str {
        "slow"
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::none()
    }

    fn max_duration(&self) -> Duration {
        Duration::from_millis(20)
    }

    async fn run(&self, _input: &(), _ctx: &TaskContext) -> Result<(), JobError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

struct Invalid;

#[async_trait]
impl Task for Invalid {
    type Input = ();
    type Output = ();

    fn id(&self) -> &'static str {
        "invalid"
    }

    fn retry_policy(&self) -> RetryPolicy {
        fast_options().retry.with_max_attempts(4)
    }

    fn max_duration(&self) -> Duration {
        Duration::from_secs(5)
    }

    async fn run(&self, _input: &(), _ctx: &TaskContext) -> Result<(), JobError> {
        Err(JobError::InvalidInput("password=hunter2 is not a valid payload".into()))
    }
}

#[tokio::test]
async fn retries_errors_until_success() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc.clone()));
    let task = Flaky::new(3, 3);

    let report = runner.trigger(&task, ()).await.unwrap();
    assert_eq!(report.attempts, 3);
    assert_eq!(report.output, 3);
    assert_eq!(task.calls.load(Ordering::SeqCst), 3);
    // Metadata is shared by every attempt of the run.
    assert_eq!(report.metadata["attempts_seen"], 3);

    let row = svc.get_job_run(&report.run_id).await.unwrap();
    assert_eq!(row.status, RunStatus::Completed);
    assert_eq!(row.attempts, 3);
    assert_eq!(row.output, Some(serde_json::json!(3)));
}

#[tokio::test]
async fn gives_up_after_max_attempts() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc.clone()));
    let task = Flaky::new(10, 2);

    let err = runner.trigger(&task, ()).await.unwrap_err();
    assert!(err.to_string().contains("upstream unavailable"));
    assert_eq!(task.calls.load(Ordering::SeqCst), 2);

    let runs = svc
        .list_job_runs(&JobRunFilter {
            task_id: Some("flaky".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert_eq!(runs[0].attempts, 2);
}

#[tokio::test]
async fn tagged_failures_are_not_retried() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc));
    let task = Tagged {
        calls: AtomicU32::new(0),
    };

    let report = runner.trigger(&task, "con-1".to_string()).await.unwrap();
    assert!(!report.output.success);
    assert_eq!(report.attempts, 1);
    assert_eq!(task.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn attempt_past_max_duration_times_out() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc.clone()));

    let err = runner.trigger(&Slow, ()).await.unwrap_err();
    assert!(matches!(err, JobError::Timeout { ref task_id, .. } if task_id == "slow"));

    let runs = svc
        .list_job_runs(&JobRunFilter {
            task_id: Some("slow".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(runs[0].status, RunStatus::Failed);
    assert!(runs[0].error.as_deref().unwrap_or_default().contains("max duration"));
}

#[tokio::test]
async fn permanent_errors_fail_once_with_redacted_message() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc.clone()));

    runner.trigger(&Invalid, ()).await.unwrap_err();

    let runs = svc
        .list_job_runs(&JobRunFilter {
            task_id: Some("invalid".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(runs[0].attempts, 1);
    let error = runs[0].error.clone().unwrap();
    assert!(error.contains("password=[REDACTED]"), "{error}");
    assert!(!error.contains("hunter2"));
}

#[tokio::test]
async fn batch_trigger_keeps_input_order_and_links_parent() {
    let svc = service().await;
    let runner = runner(JobEnv::new(svc.clone()));
    let parent = svc.create_job_run("parent", None).await.unwrap();
    let task = Tagged {
        calls: AtomicU32::new(0),
    };
    let inputs: Vec<String> = (0..5).map(|i| format!("item-{i}")).collect();

    let results = runner
        .batch_trigger_and_wait(&task, &inputs, Some(&parent.id))
        .await;
    let ids: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().output.id)
        .collect();
    assert_eq!(ids, inputs);

    let children = svc
        .list_job_runs(&JobRunFilter {
            parent_run_id: Some(parent.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(children.len(), 5);
    assert!(children.iter().all(|c| c.task_id == "tagged"));
}
