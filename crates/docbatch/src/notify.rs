//! Completion webhooks.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::batch::model::BatchStatus;
use crate::config::NotificationConfig;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Webhook endpoint returned {0}")]
    Status(u16),
}

/// Body posted to a batch's webhook once it reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchNotification {
    pub batch_id: String,
    pub status: BatchStatus,
    pub total_documents: u32,
    pub processed_documents: u32,
    pub failed_documents: u32,
}

/// Delivers batch notifications. Callers log and drop any error.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(
        &self,
        webhook_url: &str,
        notification: &BatchNotification,
    ) -> Result<(), NotificationError>;
}

/// [`NotificationDispatcher`] that POSTs JSON to the webhook URL.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookNotifier {
    async fn notify(
        &self,
        webhook_url: &str,
        notification: &BatchNotification,
    ) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(webhook_url)
            .json(notification)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Status(response.status().as_u16()));
        }

        tracing::debug!(
            batch_id = %notification.batch_id,
            status = %notification.status,
            "Webhook delivered"
        );
        Ok(())
    }
}
