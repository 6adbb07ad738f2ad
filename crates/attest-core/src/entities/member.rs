use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An employee of a tenant, kept in step with the provider directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub id: String,
    pub organization_id: String,
    pub connection_id: Option<String>,
    pub email: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A directory entry as reported by an HR or identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
    pub email: String,
    pub name: Option<String>,
    pub department: Option<String>,
    /// `false` for suspended or terminated accounts.
    pub active: bool,
}
