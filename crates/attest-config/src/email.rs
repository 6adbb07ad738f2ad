//! Transactional email provider settings.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, invalid};

fn default_api_url() -> String {
    String::from("https://api.resend.com")
}

fn default_from() -> String {
    String::from("Attest <noreply@attest.dev>")
}

/// Provider limit is two requests per second.
const fn default_batch_size() -> usize {
    2
}

const fn default_batch_interval_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    /// Sender address used for notification emails.
    #[serde(default = "default_from")]
    pub from: String,

    /// Emails sent per interval.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds.
    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: String::new(),
            from: default_from(),
            batch_size: default_batch_size(),
            batch_interval_ms: default_batch_interval_ms(),
        }
    }
}

impl EmailConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty() && !self.from.is_empty()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(invalid("email.batch_size", "batch size must be at least 1"));
        }
        Ok(())
    }
}
