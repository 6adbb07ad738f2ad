//! Cloud-security scan gateway.
//!
//! The gateway assumes the tenant's provider role, runs the provider's
//! security checks, and returns one pass/fail result per check.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use attest_config::ScannerConfig;

use crate::error::ProviderError;
use crate::http::{build_client, check_response, decode_json, join_url};

/// Scans are slow; the gateway runs every check before responding.
const SCAN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub connection_id: String,
    pub organization_id: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CheckResult {
    pub id: String,
    pub title: String,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScanReport {
    /// Gateway-assigned id for this scan.
    pub check_id: String,
    #[serde(default)]
    pub results: Vec<CheckResult>,
}

impl ScanReport {
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }
}

#[async_trait]
pub trait CloudScanner: Send + Sync {
    /// Run every security check for one connection.
    async fn scan(&self, request: &ScanRequest) -> Result<ScanReport, ProviderError>;
}

/// `POST {url}/v1/scans` with a bearer token.
pub struct HttpCloudScanner {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpCloudScanner {
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] when `scanner.url` is empty.
    pub fn from_config(config: &ScannerConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("scanner.url".into()));
        }
        Ok(Self {
            http: build_client(SCAN_TIMEOUT)?,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl CloudScanner for HttpCloudScanner {
    async fn scan(&self, request: &ScanRequest) -> Result<ScanReport, ProviderError> {
        let mut req = self
            .http
            .post(join_url(&self.url, "v1/scans"))
            .json(request);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }
        let resp = check_response(req.send().await?).await?;
        let report: ScanReport = decode_json(resp).await?;
        tracing::debug!(
            connection_id = %request.connection_id,
            check_id = %report.check_id,
            checks = report.results.len(),
            "scan completed"
        );
        Ok(report)
    }
}
