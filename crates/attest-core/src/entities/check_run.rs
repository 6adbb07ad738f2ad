use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::CheckRunStatus;

/// One execution of a check against a connection, with pass/fail counts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRun {
    pub id: String,
    pub connection_id: String,
    pub organization_id: String,
    pub check_id: String,
    pub status: CheckRunStatus,
    pub passed_count: i64,
    pub failed_count: i64,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}
