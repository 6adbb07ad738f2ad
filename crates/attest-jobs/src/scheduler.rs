//! Interval scheduler for scheduled tasks.
//!
//! Each schedule runs in its own loop on a [`JoinSet`]. The first fire
//! happens one interval after start, missed ticks are skipped, and a slow
//! run delays the next fire rather than overlapping it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use attest_core::redact::redact_secrets;

use crate::error::JobError;
use crate::runner::TaskRunner;
use crate::task::Task;

/// Payload of a scheduled fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRun {
    /// When this fire happened.
    pub timestamp: DateTime<Utc>,
    /// The previous fire of the same schedule, if any.
    pub last_timestamp: Option<DateTime<Utc>>,
}

impl ScheduledRun {
    /// A manual trigger at `Utc::now()`.
    #[must_use]
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            last_timestamp: None,
        }
    }
}

type ScheduledJob = Arc<dyn Fn(ScheduledRun) -> BoxFuture<'static, Result<(), JobError>> + Send + Sync>;

struct Schedule {
    task_id: &'static str,
    every: Duration,
    job: ScheduledJob,
}

#[derive(Default)]
pub struct Scheduler {
    schedules: Vec<Schedule>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `job` every `every`. A zero interval is raised to one second.
    #[must_use]
    pub fn every<F, Fut>(mut self, task_id: &'static str, every: Duration, job: F) -> Self
    where
        F: Fn(ScheduledRun) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), JobError>> + Send + 'static,
    {
        let job: ScheduledJob = Arc::new(move |run| Box::pin(job(run)));
        self.schedules.push(Schedule {
            task_id,
            every: every.max(Duration::from_secs(1)),
            job,
        });
        self
    }

    /// Trigger `task` through `runner` on every fire.
    #[must_use]
    pub fn task<T>(self, runner: TaskRunner, task: Arc<T>, every: Duration) -> Self
    where
        T: Task<Input = ScheduledRun> + 'static,
    {
        let task_id = task.id();
        self.every(task_id, every, move |run| {
            let runner = runner.clone();
            let task = Arc::clone(&task);
            async move { runner.trigger(task.as_ref(), run).await.map(|_| ()) }
        })
    }

    /// `(task_id, interval)` of every registered schedule.
    #[must_use]
    pub fn entries(&self) -> Vec<(&'static str, Duration)> {
        self.schedules.iter().map(|s| (s.task_id, s.every)).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    /// Run every schedule until `shutdown` resolves, then abort in-flight runs.
    pub async fn run_until<S>(self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        let mut set = JoinSet::new();
        for schedule in self.schedules {
            set.spawn(schedule_loop(schedule));
        }
        tracing::info!(schedules = set.len(), "scheduler started");
        shutdown.await;
        tracing::info!("scheduler stopping");
        set.abort_all();
        while set.join_next().await.is_some() {}
    }

    /// Run until ctrl-c.
    pub async fn run(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await;
    }
}

async fn schedule_loop(schedule: Schedule) {
    let mut ticker = tokio::time::interval(schedule.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately.
    ticker.tick().await;

    let mut last = None;
    loop {
        ticker.tick().await;
        let now = Utc::now();
        let run = ScheduledRun {
            timestamp: now,
            last_timestamp: last,
        };
        last = Some(now);
        tracing::debug!(task_id = schedule.task_id, "schedule fired");
        if let Err(e) = (schedule.job)(run).await {
            tracing::error!(
                task_id = schedule.task_id,
                error = %redact_secrets(&e.to_string()),
                "scheduled run failed"
            );
        }
    }
}
