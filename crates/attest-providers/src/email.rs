//! Transactional email delivery.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use attest_config::EmailConfig;

use crate::error::ProviderError;
use crate::http::{build_client, check_response, decode_json, join_url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message. Returns the provider's message id.
    async fn send(&self, message: &EmailMessage) -> Result<String, ProviderError>;
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

/// `POST {api_url}/emails`.
pub struct HttpEmailSender {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailSender {
    /// # Errors
    ///
    /// Returns [`ProviderError::NotConfigured`] when the API key or sender is missing.
    pub fn from_config(config: &EmailConfig) -> Result<Self, ProviderError> {
        if !config.is_configured() {
            return Err(ProviderError::NotConfigured("email.api_key".into()));
        }
        Ok(Self {
            http: build_client(Duration::from_secs(15))?,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<String, ProviderError> {
        let body = SendRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.text,
        };
        let resp = self
            .http
            .post(join_url(&self.api_url, "emails"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let data: SendResponse = decode_json(check_response(resp).await?).await?;
        Ok(data.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let body = SendRequest {
            from: "Attest <noreply@attest.dev>",
            to: ["owner@example.com"],
            subject: "Review due",
            text: "Please review.",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["to"][0], "owner@example.com");
        assert_eq!(json["from"], "Attest <noreply@attest.dev>");
    }

    #[test]
    fn unconfigured_sender_is_rejected() {
        assert!(HttpEmailSender::from_config(&EmailConfig::default()).is_err());
    }
}
