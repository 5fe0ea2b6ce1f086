use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use tracing::{info, instrument};

use crate::models::Order;

/// Notification dispatch errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Dispatch rejected: {0}")]
    Rejected(String),
}

/// Sends buyer-facing notifications. An order is valid even if its
/// confirmation notification fails — callers fire and forget, logging
/// failures.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotificationError>;
}

/// Posts confirmation payloads to a webhook (typically an email-sending
/// cloud function).
pub struct WebhookDispatcher {
    client: reqwest::Client,
    webhook_url: String,
}

impl WebhookDispatcher {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotificationError> {
        let payload = json!({
            "type": "order_confirmation",
            "order_id": order.id,
            "order_number": order.order_number,
            "email": order.shipping.email,
            "name": order.shipping.full_name,
            "total": order.total,
            "currency": order.currency,
            "payment_method": order.payment_method,
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationError::Rejected(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Logs the confirmation instead of sending it. Default when no webhook is
/// configured.
#[derive(Default)]
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn order_confirmation(&self, order: &Order) -> Result<(), NotificationError> {
        info!(
            "Order confirmation for {} ({}) -> {}",
            order.order_number, order.total, order.shipping.email
        );
        Ok(())
    }
}
