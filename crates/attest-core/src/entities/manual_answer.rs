use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant-authored questionnaire answer, mirrored into the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManualAnswer {
    pub id: String,
    pub organization_id: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
