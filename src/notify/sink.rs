use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::notify::Digest;
use crate::{MonitorError, MonitorResult};

/// Body POSTed to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookMessage {
    pub text: String,
}

impl From<&Digest> for WebhookMessage {
    fn from(digest: &Digest) -> Self {
        Self {
            text: digest.message(),
        }
    }
}

/// Delivers a digest exactly once; retrying is up to the caller.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, digest: &Digest) -> MonitorResult<()>;
}

#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, timeout: Duration) -> MonitorResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    #[instrument(skip_all)]
    async fn deliver(&self, digest: &Digest) -> MonitorResult<()> {
        let message = WebhookMessage::from(digest);
        let response = self.client.post(&self.url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("webhook responded with {status}: {body}");
            return Err(MonitorError::Delivery(format!(
                "webhook responded with {status}"
            )));
        }

        info!("digest delivered");
        Ok(())
    }
}
