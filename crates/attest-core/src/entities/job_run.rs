use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::RunStatus;

/// A persisted task invocation. `metadata` is the latest progress snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRun {
    pub id: String,
    pub task_id: String,
    pub parent_run_id: Option<String>,
    pub status: RunStatus,
    pub attempts: i64,
    pub metadata: Option<serde_json::Value>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
