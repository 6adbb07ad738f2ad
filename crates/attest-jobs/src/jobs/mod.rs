//! The registered background jobs.
//!
//! | Task id                      | Kind      | Input                |
//! |------------------------------|-----------|----------------------|
//! | `cloud-scan`                 | scheduled | `ScheduledRun`       |
//! | `cloud-scan-worker`          | worker    | `CloudScanInput`     |
//! | `delete-manual-answers`      | on demand | `DeleteAnswersInput` |
//! | `delete-manual-answer-batch` | worker    | `DeleteBatchInput`   |
//! | `policy-review`              | scheduled | `ScheduledRun`       |
//! | `employee-sync`              | scheduled | `ScheduledRun`       |

pub mod cloud_scan;
pub mod delete_answers;
pub mod employee_sync;
pub mod policy_review;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use attest_config::SchedulesConfig;

use crate::env::JobSettings;
use crate::retry::RetryPolicy;
use crate::runner::TaskRunner;
use crate::scheduler::Scheduler;
use crate::task::Task;

pub use cloud_scan::{CloudScanInput, CloudScanOrchestrator, CloudScanWorker};
pub use delete_answers::{
    DeleteAnswerBatchWorker, DeleteAnswersInput, DeleteAnswersOrchestrator, DeleteBatchInput,
};
pub use employee_sync::{DirectorySyncHandler, EmployeeSyncTask, SyncHandler, SyncHandlers, SyncStats};
pub use policy_review::{PolicyReviewSummary, PolicyReviewTask};

pub const CLOUD_SCAN: &str = "cloud-scan";
pub const CLOUD_SCAN_WORKER: &str = "cloud-scan-worker";
pub const DELETE_MANUAL_ANSWERS: &str = "delete-manual-answers";
pub const DELETE_MANUAL_ANSWER_BATCH: &str = "delete-manual-answer-batch";
pub const POLICY_REVIEW: &str = "policy-review";
pub const EMPLOYEE_SYNC: &str = "employee-sync";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Scheduled,
    OnDemand,
    Worker,
}

/// One row of `attest jobs`.
#[derive(Debug, Clone, Serialize)]
pub struct JobDescriptor {
    pub id: &'static str,
    pub kind: JobKind,
    pub retry: RetryPolicy,
    #[serde(serialize_with = "serialize_secs")]
    pub max_duration: Duration,
    #[serde(serialize_with = "serialize_opt_secs")]
    pub every: Option<Duration>,
    /// Items per batch for orchestrators.
    pub batch_size: Option<usize>,
}

fn serialize_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

fn serialize_opt_secs<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs()),
        None => s.serialize_none(),
    }
}

/// Every job, built once from settings.
pub struct Jobs {
    settings: JobSettings,
    pub cloud_scan: Arc<CloudScanOrchestrator>,
    pub delete_answers: Arc<DeleteAnswersOrchestrator>,
    pub policy_review: Arc<PolicyReviewTask>,
    pub employee_sync: Arc<EmployeeSyncTask>,
}

impl Jobs {
    #[must_use]
    pub fn new(settings: JobSettings, handlers: SyncHandlers) -> Self {
        Self {
            cloud_scan: Arc::new(CloudScanOrchestrator::new(&settings)),
            delete_answers: Arc::new(DeleteAnswersOrchestrator::new(&settings)),
            policy_review: Arc::new(PolicyReviewTask::new(&settings)),
            employee_sync: Arc::new(EmployeeSyncTask::new(&settings, handlers)),
            settings,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &JobSettings {
        &self.settings
    }

    #[must_use]
    pub fn describe(&self, schedules: &SchedulesConfig) -> Vec<JobDescriptor> {
        fn row<T: Task>(
            task: &T,
            kind: JobKind,
            every: Option<u64>,
            batch_size: Option<usize>,
        ) -> JobDescriptor {
            JobDescriptor {
                id: task.id(),
                kind,
                retry: task.retry_policy(),
                max_duration: task.max_duration(),
                every: every.map(Duration::from_secs),
                batch_size,
            }
        }

        let s = &self.settings;
        vec![
            row(
                self.cloud_scan.as_ref(),
                JobKind::Scheduled,
                Some(schedules.cloud_scan_secs),
                Some(s.scan_batch_size),
            ),
            row(self.cloud_scan.worker(), JobKind::Worker, None, None),
            row(
                self.delete_answers.as_ref(),
                JobKind::OnDemand,
                None,
                Some(s.answer_batch_size),
            ),
            row(self.delete_answers.worker(), JobKind::Worker, None, None),
            row(
                self.policy_review.as_ref(),
                JobKind::Scheduled,
                Some(schedules.policy_review_secs),
                Some(s.email_batch_size),
            ),
            row(
                self.employee_sync.as_ref(),
                JobKind::Scheduled,
                Some(schedules.employee_sync_secs),
                Some(s.sync_batch_size),
            ),
        ]
    }

    /// Scheduler with every scheduled job registered.
    #[must_use]
    pub fn scheduler(&self, runner: &TaskRunner, schedules: &SchedulesConfig) -> Scheduler {
        Scheduler::new()
            .task(
                runner.clone(),
                Arc::clone(&self.cloud_scan),
                Duration::from_secs(schedules.cloud_scan_secs),
            )
            .task(
                runner.clone(),
                Arc::clone(&self.policy_review),
                Duration::from_secs(schedules.policy_review_secs),
            )
            .task(
                runner.clone(),
                Arc::clone(&self.employee_sync),
                Duration::from_secs(schedules.employee_sync_secs),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn describe_lists_every_task_once() {
        let jobs = Jobs::new(JobSettings::default(), SyncHandlers::new());
        let rows = jobs.describe(&SchedulesConfig::default());
        let ids: Vec<_> = rows.iter().map(|r| r.id).collect();
        assert_eq!(
            ids,
            vec![
                CLOUD_SCAN,
                CLOUD_SCAN_WORKER,
                DELETE_MANUAL_ANSWERS,
                DELETE_MANUAL_ANSWER_BATCH,
                POLICY_REVIEW,
                EMPLOYEE_SYNC
            ]
        );
        let scheduled = rows.iter().filter(|r| r.kind == JobKind::Scheduled).count();
        assert_eq!(scheduled, 3);
        assert_eq!(rows[2].batch_size, Some(100));
    }

    #[test]
    fn descriptor_json_uses_seconds() {
        let jobs = Jobs::new(JobSettings::default(), SyncHandlers::new());
        let rows = jobs.describe(&SchedulesConfig::default());
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["kind"], "scheduled");
        assert_eq!(json["max_duration"], 3_600);
        assert_eq!(rows[1].max_duration, Duration::from_secs(300));
        assert_eq!(json["every"], 86_400);
    }
}
