//! Per-task retry policy.

use std::time::Duration;

use serde::Serialize;

use attest_config::RetrySettings;

/// Exponential backoff between attempts of one task invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetryPolicy {
    /// Attempts including the first one. Never below 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub min_timeout: Duration,
    /// Backoff cap.
    pub max_timeout: Duration,
    /// Multiplier applied per further attempt.
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySettings::default())
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            min_timeout: Duration::from_millis(settings.min_timeout_ms),
            max_timeout: Duration::from_millis(settings.max_timeout_ms),
            factor: settings.factor.max(1),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            min_timeout: Duration::ZERO,
            max_timeout: Duration::ZERO,
            factor: 1,
        }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = if max_attempts == 0 { 1 } else { max_attempts };
        self
    }

    /// Delay after failed attempt `attempt` (1-based):
    /// `min(min_timeout * factor^(attempt-1), max_timeout)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let multiplier = self.factor.checked_pow(exp).unwrap_or(u32::MAX);
        self.min_timeout
            .checked_mul(multiplier)
            .unwrap_or(self.max_timeout)
            .min(self.max_timeout)
    }
}
