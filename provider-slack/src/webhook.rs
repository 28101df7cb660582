//! Slack incoming-webhook notifier

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::notify::{Notification, Notifier};
use core_runtime::MirrorConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SlackError};

/// Body of an incoming-webhook post.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct WebhookPayload<'a> {
    text: String,
    channel: &'a str,
    username: &'a str,
}

/// Posts one message per mirrored file to a Slack incoming webhook.
///
/// A post is not idempotent, so each notification is attempted exactly once.
pub struct SlackWebhookNotifier {
    http_client: Arc<dyn HttpClient>,
    webhook_url: String,
    channel: String,
    username: String,
}

impl SlackWebhookNotifier {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        webhook_url: impl Into<String>,
        channel: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            webhook_url: webhook_url.into(),
            channel: channel.into(),
            username: username.into(),
        }
    }

    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &MirrorConfig) -> Self {
        Self::new(
            http_client,
            config.slack_webhook.clone(),
            config.slack_channel.clone(),
            config.slack_username.clone(),
        )
    }

    async fn post(&self, notification: &Notification) -> Result<()> {
        let payload = WebhookPayload {
            text: notification.text(),
            channel: &self.channel,
            username: &self.username,
        };

        let request = HttpRequest::new(HttpMethod::Post, self.webhook_url.clone())
            .json(&payload)
            .map_err(|e| SlackError::Payload(e.to_string()))?;

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await?;

        if !response.is_success() {
            return Err(SlackError::Rejected {
                status: response.status,
                body: String::from_utf8_lossy(&response.body).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackWebhookNotifier {
    #[instrument(skip(self, notification), fields(file_id = %notification.file_id, channel = %self.channel))]
    async fn notify(&self, notification: &Notification) -> bridge_traits::error::Result<()> {
        match self.post(notification).await {
            Ok(()) => {
                debug!("Slack notification sent");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Slack notification failed");
                Err(e.into())
            }
        }
    }
}
