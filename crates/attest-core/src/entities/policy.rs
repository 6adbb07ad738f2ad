use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{PolicyStatus, ReviewFrequency};

/// A compliance policy with an optional review cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Policy {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub status: PolicyStatus,
    pub frequency: Option<ReviewFrequency>,
    pub review_date: Option<NaiveDate>,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
