use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("mail transport request failed: {0}")]
    Request(String),

    #[error("mail transport rejected the message: {0}")]
    Rejected(String),
}

/// One message, fully rendered, ready for the transport.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundEmail {
    pub to: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reply_to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Outbound mail collaborator. Implementations must not retry; the worker
/// records failures per record.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send one message, returning a transport-assigned message id.
    async fn send(&self, message: &OutboundEmail) -> Result<String, MailError>;
}

/// HTTP JSON mail gateway client.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from_email: String,
}

impl HttpMailer {
    pub fn new() -> Self {
        let mail = &config::config().mail;
        Self {
            client: reqwest::Client::new(),
            endpoint: mail.endpoint.clone(),
            from_email: mail.from_email.clone(),
        }
    }
}

impl Default for HttpMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct GatewayRequest<'a> {
    from: &'a str,
    #[serde(flatten)]
    message: &'a OutboundEmail,
}

#[async_trait]
impl MailTransport for HttpMailer {
    async fn send(&self, message: &OutboundEmail) -> Result<String, MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&GatewayRequest {
                from: &self.from_email,
                message,
            })
            .send()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected(format!("{}: {}", status, body)));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;
        Ok(body
            .get("messageId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }
}
