//! Job error types.

use std::time::Duration;

use thiserror::Error;

use attest_db::error::DatabaseError;
use attest_providers::ProviderError;

/// Errors that fail a task attempt. Per-item failures are not errors; they
/// travel as [`crate::batch::ItemResult`] values.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An attempt ran past the task's max duration.
    #[error("task '{task_id}' exceeded its max duration of {after:?}")]
    Timeout { task_id: String, after: Duration },

    /// The payload can never succeed; not retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator the task needs is not configured; not retried.
    #[error("not configured: {0}")]
    NotConfigured(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JobError {
    /// Whether the runner should spend another attempt on this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidInput(_) | Self::NotConfigured(_) | Self::Serde(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_errors_are_not_retryable() {
        assert!(!JobError::InvalidInput("batch size 0".into()).is_retryable());
        assert!(!JobError::NotConfigured("scanner".into()).is_retryable());
        assert!(JobError::Database(DatabaseError::NoResult).is_retryable());
        assert!(
            JobError::Timeout {
                task_id: "t".into(),
                after: Duration::from_secs(1)
            }
            .is_retryable()
        );
    }
}
