//! Employee directories for the sync handlers.
//!
//! Each provider returns its own record shape; both are mapped onto
//! [`Employee`]. Records without an email are skipped since members are
//! keyed by email.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use attest_config::DirectoryConfig;
use attest_core::entities::{Connection, Employee};

use crate::error::ProviderError;
use crate::http::{build_client, check_response, decode_json, join_url};

/// Guard against a directory that keeps returning page tokens.
const MAX_PAGES: usize = 100;

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Manifest slug this directory serves.
    fn provider(&self) -> &'static str;

    /// Every employee visible through `connection`, active or not.
    async fn list_employees(&self, connection: &Connection) -> Result<Vec<Employee>, ProviderError>;
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Google Workspace
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUsersPage {
    #[serde(default)]
    users: Vec<GoogleUser>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleUser {
    primary_email: Option<String>,
    name: Option<GoogleName>,
    org_unit_path: Option<String>,
    #[serde(default)]
    suspended: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleName {
    full_name: Option<String>,
}

impl GoogleUser {
    fn into_employee(self) -> Option<Employee> {
        let email = non_empty(self.primary_email)?;
        // "/" is the root org unit, which says nothing about department.
        let department = non_empty(
            self.org_unit_path
                .map(|p| p.trim_start_matches('/').to_string()),
        );
        Some(Employee {
            email,
            name: non_empty(self.name.and_then(|n| n.full_name)),
            department,
            active: !self.suspended,
        })
    }
}

pub struct GoogleWorkspaceDirectory {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GoogleWorkspaceDirectory {
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] without a directory token.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("directory.token".into()));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(30))?,
            base_url: config.google_workspace_url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl EmployeeDirectory for GoogleWorkspaceDirectory {
    fn provider(&self) -> &'static str {
        attest_core::manifest::GOOGLE_WORKSPACE.slug
    }

    async fn list_employees(&self, connection: &Connection) -> Result<Vec<Employee>, ProviderError> {
        let base = join_url(
            &self.base_url,
            "admin/directory/v1/users?customer=my_customer&maxResults=500",
        );
        let mut employees = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let url = match &page_token {
                Some(token) => format!("{base}&pageToken={}", urlencoding::encode(token)),
                None => base.clone(),
            };
            let resp = self.http.get(&url).bearer_auth(&self.token).send().await?;
            let page: GoogleUsersPage = decode_json(check_response(resp).await?).await?;
            employees.extend(page.users.into_iter().filter_map(GoogleUser::into_employee));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => {
                    tracing::debug!(connection_id = %connection.id, count = employees.len(), "google workspace directory listed");
                    return Ok(employees);
                }
            }
        }
        Err(ProviderError::Parse(format!(
            "google workspace directory exceeded {MAX_PAGES} pages"
        )))
    }
}

// ---------------------------------------------------------------------------
// Rippling
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct RipplingPage {
    #[serde(default)]
    results: Vec<RipplingEmployee>,
}

#[derive(Deserialize)]
struct RipplingEmployee {
    work_email: Option<String>,
    name: Option<String>,
    department: Option<String>,
    employment_status: Option<String>,
}

impl RipplingEmployee {
    fn into_employee(self) -> Option<Employee> {
        let email = non_empty(self.work_email)?;
        Some(Employee {
            email,
            name: non_empty(self.name),
            department: non_empty(self.department),
            active: self
                .employment_status
                .is_some_and(|s| s.eq_ignore_ascii_case("active")),
        })
    }
}

pub struct RipplingDirectory {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RipplingDirectory {
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] without a directory token.
    pub fn from_config(config: &DirectoryConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("directory.token".into()));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(30))?,
            base_url: config.rippling_url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl EmployeeDirectory for RipplingDirectory {
    fn provider(&self) -> &'static str {
        attest_core::manifest::RIPPLING.slug
    }

    async fn list_employees(&self, connection: &Connection) -> Result<Vec<Employee>, ProviderError> {
        let resp = self
            .http
            .get(join_url(&self.base_url, "platform/api/employees"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let page: RipplingPage = decode_json(check_response(resp).await?).await?;
        let employees: Vec<_> = page
            .results
            .into_iter()
            .filter_map(RipplingEmployee::into_employee)
            .collect();
        tracing::debug!(connection_id = %connection.id, count = employees.len(), "rippling directory listed");
        Ok(employees)
    }
}
