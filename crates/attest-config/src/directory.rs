//! Employee directory endpoints for provider-specific sync handlers.

use serde::{Deserialize, Serialize};

fn default_google_workspace_url() -> String {
    String::from("https://admin.googleapis.com")
}

fn default_rippling_url() -> String {
    String::from("https://api.rippling.com")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_google_workspace_url")]
    pub google_workspace_url: String,

    #[serde(default = "default_rippling_url")]
    pub rippling_url: String,

    /// Bearer token forwarded to the directory APIs.
    #[serde(default)]
    pub token: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            google_workspace_url: default_google_workspace_url(),
            rippling_url: default_rippling_url(),
            token: String::new(),
        }
    }
}

impl DirectoryConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty()
    }
}
