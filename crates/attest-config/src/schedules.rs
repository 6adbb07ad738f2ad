//! Interval schedules for the scheduler loop.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, invalid};

const DAY_SECS: u64 = 24 * 60 * 60;

const fn default_daily() -> u64 {
    DAY_SECS
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulesConfig {
    /// Seconds between cloud-scan orchestrator runs.
    #[serde(default = "default_daily")]
    pub cloud_scan_secs: u64,

    /// Seconds between policy-review runs.
    #[serde(default = "default_daily")]
    pub policy_review_secs: u64,

    /// Seconds between employee-sync runs.
    #[serde(default = "default_daily")]
    pub employee_sync_secs: u64,
}

impl Default for SchedulesConfig {
    fn default() -> Self {
        Self {
            cloud_scan_secs: DAY_SECS,
            policy_review_secs: DAY_SECS,
            employee_sync_secs: DAY_SECS,
        }
    }
}

impl SchedulesConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("schedules.cloud_scan_secs", self.cloud_scan_secs),
            ("schedules.policy_review_secs", self.policy_review_secs),
            ("schedules.employee_sync_secs", self.employee_sync_secs),
        ] {
            if value == 0 {
                return Err(invalid(field, "interval must be at least 1 second"));
            }
        }
        Ok(())
    }
}
