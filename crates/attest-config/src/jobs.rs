//! Batch sizes, retry, and duration limits for background jobs.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, invalid};

const fn default_scan_batch_size() -> usize {
    50
}

const fn default_sync_batch_size() -> usize {
    50
}

const fn default_answer_batch_size() -> usize {
    100
}

const fn default_max_duration_secs() -> u64 {
    300
}

const fn default_orchestrator_max_duration_secs() -> u64 {
    3_600
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_min_timeout_ms() -> u64 {
    1_000
}

const fn default_max_timeout_ms() -> u64 {
    10_000
}

const fn default_factor() -> u32 {
    2
}

/// Retry policy applied to tasks that do not declare their own.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry.
    #[serde(default = "default_min_timeout_ms")]
    pub min_timeout_ms: u64,

    /// Backoff cap.
    #[serde(default = "default_max_timeout_ms")]
    pub max_timeout_ms: u64,

    /// Multiplier applied per attempt.
    #[serde(default = "default_factor")]
    pub factor: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_timeout_ms: default_min_timeout_ms(),
            max_timeout_ms: default_max_timeout_ms(),
            factor: default_factor(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Connections per cloud-scan batch.
    #[serde(default = "default_scan_batch_size")]
    pub scan_batch_size: usize,

    /// Connections per employee-sync batch.
    #[serde(default = "default_sync_batch_size")]
    pub sync_batch_size: usize,

    /// Manual answers per deletion worker invocation.
    #[serde(default = "default_answer_batch_size")]
    pub answer_batch_size: usize,

    /// Upper bound for a single worker attempt, in seconds.
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    /// Upper bound for one attempt of an orchestrator, which waits on its
    /// workers and so must outlast every one of them.
    #[serde(default = "default_orchestrator_max_duration_secs")]
    pub orchestrator_max_duration_secs: u64,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            scan_batch_size: default_scan_batch_size(),
            sync_batch_size: default_sync_batch_size(),
            answer_batch_size: default_answer_batch_size(),
            max_duration_secs: default_max_duration_secs(),
            orchestrator_max_duration_secs: default_orchestrator_max_duration_secs(),
            retry: RetrySettings::default(),
        }
    }
}

impl JobsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("jobs.scan_batch_size", self.scan_batch_size),
            ("jobs.sync_batch_size", self.sync_batch_size),
            ("jobs.answer_batch_size", self.answer_batch_size),
        ] {
            if value == 0 {
                return Err(invalid(field, "batch size must be at least 1"));
            }
        }
        if self.max_duration_secs == 0 {
            return Err(invalid("jobs.max_duration_secs", "must be at least 1"));
        }
        if self.orchestrator_max_duration_secs < self.max_duration_secs {
            return Err(invalid(
                "jobs.orchestrator_max_duration_secs",
                "must not be shorter than jobs.max_duration_secs",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("jobs.retry.max_attempts", "must be at least 1"));
        }
        if self.retry.factor == 0 {
            return Err(invalid("jobs.retry.factor", "must be at least 1"));
        }
        if self.retry.min_timeout_ms > self.retry.max_timeout_ms {
            return Err(invalid(
                "jobs.retry.min_timeout_ms",
                "must not exceed jobs.retry.max_timeout_ms",
            ));
        }
        Ok(())
    }
}
