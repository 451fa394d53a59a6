//! Outbound notifications to the chat platform.
//!
//! Delivery is fire-and-forget from the tracker's point of view: a failed
//! notification is logged and never rolls back what triggered it.

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::error::{Result, TrackerError};
use crate::config::NotificationConfig;
use crate::db::ChannelId;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: ChannelId, text: &str) -> Result<()>;
}

/// Writes notifications to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel: ChannelId, text: &str) -> Result<()> {
        info!(channel, "Notification: {}", text);
        Ok(())
    }
}

/// Relays notifications to an HTTP endpoint as `{ "channel_id", "content" }`.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AnyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, channel: ChannelId, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({
                "channel_id": channel,
                "content": text,
            }))
            .send()
            .await
            .map_err(|e| TrackerError::notification(format!("webhook unreachable: {e}")))?;

        response
            .error_for_status()
            .map_err(|e| TrackerError::notification(format!("webhook rejected message: {e}")))?;

        Ok(())
    }
}

pub fn build_notifier(config: &NotificationConfig) -> AnyResult<Arc<dyn Notifier>> {
    match config.webhook_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => {
            info!("Delivering notifications to webhook {}", url);
            let notifier =
                WebhookNotifier::new(url, Duration::from_secs(config.timeout_seconds))?;
            Ok(Arc::new(notifier))
        }
        _ => {
            info!("No notification webhook configured, notifications will be logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}

/// Deliver a notification, logging instead of propagating a failure.
/// Returns whether delivery succeeded.
pub async fn announce(notifier: &dyn Notifier, channel: ChannelId, text: &str) -> bool {
    match notifier.notify(channel, text).await {
        Ok(()) => true,
        Err(e) => {
            warn!(channel, "Failed to deliver notification: {}", e);
            false
        }
    }
}
