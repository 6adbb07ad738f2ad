//! Busy/locked retry for concurrent writers.
//!
//! Workers in the same batch write concurrently. File-backed databases can
//! report `SQLITE_BUSY` while another write holds the lock; those writes are
//! retried with capped exponential backoff. Constraint and syntax errors
//! are never retried.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Initial delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff is capped here).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryConfig {
    /// Delay after the given failed attempt (1-based): `base * 2^(attempt-1)`, capped.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}

/// Whether `e` is a transient lock-contention error.
pub fn is_busy_error(e: &libsql::Error) -> bool {
    let msg = e.to_string().to_ascii_lowercase();
    msg.contains("database is locked") || msg.contains("database is busy") || msg.contains("sqlite_busy")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_then_caps() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(100));
        assert_eq!(config.delay_for(2), Duration::from_millis(200));
        assert_eq!(config.delay_for(3), Duration::from_millis(400));
        assert_eq!(config.delay_for(10), Duration::from_secs(2));
    }

    #[test]
    fn constraint_errors_are_not_busy() {
        let e = libsql::Error::SqliteFailure(19, "UNIQUE constraint failed: organizations.id".into());
        assert!(!is_busy_error(&e));
    }

    #[test]
    fn locked_errors_are_busy() {
        let e = libsql::Error::SqliteFailure(5, "database is locked".into());
        assert!(is_busy_error(&e));
    }
}
