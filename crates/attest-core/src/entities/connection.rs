use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::ConnectionStatus;

/// A tenant's link to an external provider, identified by manifest slug.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: String,
    pub organization_id: String,
    pub provider: String,
    pub status: ConnectionStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }
}
