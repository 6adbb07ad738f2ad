use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant. Every other record is scoped by `organization_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
