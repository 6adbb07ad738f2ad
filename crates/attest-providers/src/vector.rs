//! Vector index holding manual-answer embeddings.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use attest_config::VectorConfig;

use crate::error::ProviderError;
use crate::http::{build_client, check_response, decode_json, join_url};

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Delete vectors by id. Returns how many existed and were removed;
    /// unknown ids are not an error.
    async fn delete(&self, ids: &[String]) -> Result<u64, ProviderError>;
}

#[derive(Deserialize)]
struct DeleteResponse {
    result: DeleteResult,
}

#[derive(Deserialize)]
struct DeleteResult {
    deleted: u64,
}

/// REST index client: `POST {url}/delete` with a JSON array of ids.
pub struct HttpVectorStore {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpVectorStore {
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] unless both `vector.url` and
    /// `vector.token` are set.
    pub fn from_config(config: &VectorConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("vector.url, vector.token".into()));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(30))?,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn delete(&self, ids: &[String]) -> Result<u64, ProviderError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let resp = self
            .http
            .post(join_url(&self.url, "delete"))
            .bearer_auth(&self.token)
            .json(ids)
            .send()
            .await?;
        let data: DeleteResponse = decode_json(check_response(resp).await?).await?;
        Ok(data.result.deleted)
    }
}
