//! Notification delivery for alerts

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::config::{NotificationConfig, Secret};
use crate::error::{truncate, Error, Result};
use crate::models::AlertMessage;

use super::message::to_mime;

/// Capability to deliver one rendered alert
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Deliver `message`. One attempt, no retries.
    async fn send(&self, message: &AlertMessage) -> Result<()>;
}

/// Posts the raw MIME message to an HTTP mail relay
pub struct RelaySender {
    client: Client,
    url: Url,
    token: Secret,
}

impl RelaySender {
    /// Create a relay sender from the notification section
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        if config.relay_url.trim().is_empty() {
            return Err(Error::config("notification.relay_url is not set"));
        }
        let url = Url::parse(&config.relay_url).map_err(|e| {
            Error::config(format!("notification.relay_url is not a valid URL: {e}"))
        })?;

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            client,
            url,
            token: config.relay_token.clone(),
        })
    }
}

#[async_trait]
impl MessageSender for RelaySender {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        let payload = RelayPayload {
            from: &message.sender,
            to: &message.recipient,
            raw: to_mime(message)?,
        };

        let mut request = self.client.post(self.url.clone()).json(&payload);
        if !self.token.is_empty() {
            request = request.bearer_auth(self.token.expose());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::notification(format!("mail relay request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "mail relay returned {}: {}",
                status.as_u16(),
                truncate(&body)
            )));
        }

        info!(
            message_id = %message.id,
            kind = message.kind.as_str(),
            recipient = %message.recipient,
            "Alert handed to mail relay"
        );
        Ok(())
    }
}

/// Logs alerts instead of delivering them (dry runs)
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl MessageSender for LogSender {
    async fn send(&self, message: &AlertMessage) -> Result<()> {
        info!(
            message_id = %message.id,
            kind = message.kind.as_str(),
            sender = %message.sender,
            recipient = %message.recipient,
            subject = %message.subject,
            "Dry run: alert not sent"
        );
        debug!(raw = %to_mime(message)?, "Dry run message");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    raw: String,
}
