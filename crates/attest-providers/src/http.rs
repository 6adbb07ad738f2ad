//! Shared HTTP helpers for provider clients.

use std::time::Duration;

use crate::error::ProviderError;

const USER_AGENT: &str = concat!("attest/", env!("CARGO_PKG_VERSION"));

/// Build the `reqwest` client every provider uses.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the TLS backend cannot initialise.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()?)
}

/// Join a base URL and a path without doubling slashes.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success. Handles:
/// - **429 Too Many Requests** → [`ProviderError::RateLimited`] with
///   `Retry-After` header parsing (falls back to 60 s if absent or
///   unparseable).
/// - **Non-success status** → [`ProviderError::Api`] with status code and
///   response body.
///
/// # Errors
///
/// See above.
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !resp.status().is_success() {
        return Err(ProviderError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

/// Decode a JSON body, reporting shape mismatches as [`ProviderError::Parse`].
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the body cannot be read and
/// [`ProviderError::Parse`] if it is not the expected JSON.
pub async fn decode_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ProviderError::Parse(e.to_string()))
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(60)
}
