//! Google Chat incoming webhooks.
//!
//! The webhook URL carries its own key and token, so no Drive credentials are
//! involved.

use crate::client::map_error_response;
use crate::errors::{DriveError, DriveResult};
use crate::transport::{HttpMethod, HttpRequest, HttpTransport, RequestBody, ReqwestTransport};
use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const JSON_UTF8: &str = "application/json; charset=UTF-8";

/// Payload for a text message.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    /// Message text.
    pub text: String,
}

impl WebhookMessage {
    /// Creates a text message.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Posts messages to Chat spaces through incoming webhooks.
#[derive(Clone)]
pub struct ChatWebhook {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl ChatWebhook {
    /// Creates a webhook client over `reqwest`.
    pub fn new() -> DriveResult<Self> {
        let timeout = Duration::from_secs(30);
        let transport = ReqwestTransport::with_timeouts(timeout, Duration::from_secs(10))
            .map_err(|e| DriveError::configuration(format!("Failed to create transport: {}", e)))?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Creates a webhook client over a custom transport.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Posts `text` to the space behind `webhook_url` and returns the created
    /// message resource.
    pub async fn send_message(&self, webhook_url: &str, text: &str) -> DriveResult<serde_json::Value> {
        let url = Url::parse(webhook_url)
            .map_err(|e| DriveError::invalid_argument(format!("Invalid webhook URL: {}", e)))?;

        let body = serde_json::to_vec(&WebhookMessage::new(text))?;
        let mut request = HttpRequest::new(HttpMethod::Post, url);
        request
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
        request.body = Some(RequestBody::Bytes(Bytes::from(body)));
        request.timeout = Some(self.timeout);

        debug!(host = request.url.host_str().unwrap_or(""), "Posting webhook message");
        let response = self.transport.send(request).await?;
        if !response.status.is_success() {
            return Err(map_error_response(&response));
        }

        let message = if response.body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&response.body)?
        };
        info!("Webhook message sent");
        Ok(message)
    }
}

impl std::fmt::Debug for ChatWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatWebhook")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
