//! Vector store and cloud scanner endpoints.

use serde::{Deserialize, Serialize};

/// REST vector index holding manual-answer embeddings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VectorConfig {
    /// Index REST URL (e.g., `https://my-index.upstash.io`).
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub token: String,
}

impl VectorConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.token.is_empty()
    }
}

/// Scan gateway that assumes provider roles and runs security checks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub token: String,
}

impl ScannerConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }
}
