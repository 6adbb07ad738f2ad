//! # attest-jobs
//!
//! Background task runner and the scheduled jobs built on it.
//!
//! - [`task::Task`] declares a unit of work with its retry policy and max
//!   duration; [`runner::TaskRunner`] executes it, recording a `job_runs`
//!   row per invocation.
//! - [`batch`] fans work items out in fixed-size batches and tallies
//!   per-item results without stopping on failures.
//! - [`pacer::Pacer`] bounds sends per interval for rate-limited providers.
//! - [`scheduler::Scheduler`] fires scheduled tasks on fixed intervals.
//! - [`jobs`] holds the cloud-scan, manual-answer deletion, policy-review
//!   and employee-sync jobs.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use attest_config::AttestConfig;
//! use attest_db::service::AttestService;
//! use attest_jobs::{JobEnv, JobSettings, Jobs, ScheduledRun, SyncHandlers, TaskRunner};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = AttestConfig::load()?;
//! let service = Arc::new(AttestService::new_local(&config.database.path).await?);
//! let runner = TaskRunner::new(Arc::new(JobEnv::from_config(service, &config)?));
//! let jobs = Jobs::new(
//!     JobSettings::from_config(&config),
//!     SyncHandlers::from_config(&config.directory)?,
//! );
//!
//! let report = runner.trigger(jobs.cloud_scan.as_ref(), ScheduledRun::now()).await?;
//! println!("{} connections scanned", report.output.total);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod env;
pub mod error;
pub mod jobs;
pub mod metadata;
pub mod pacer;
pub mod retry;
pub mod runner;
pub mod scheduler;
pub mod task;

pub use batch::{BatchSummary, ItemResult};
pub use env::{JobEnv, JobSettings, TaskOptions};
pub use error::JobError;
pub use jobs::{JobDescriptor, JobKind, Jobs, SyncHandlers};
pub use metadata::RunMetadata;
pub use retry::RetryPolicy;
pub use runner::{RunReport, TaskRunner};
pub use scheduler::{ScheduledRun, Scheduler};
pub use task::{Task, TaskContext};
