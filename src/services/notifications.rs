use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// A user- or operator-facing notification. Delivery is always best-effort:
/// a failed dispatch is logged and must never abort the operation that
/// triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    OrderConfirmation {
        order_id: Uuid,
        order_number: String,
        recipient: String,
        total: Decimal,
        currency: String,
    },
    OrderCancelled {
        order_id: Uuid,
        order_number: String,
        recipient: String,
        reason: Option<String>,
    },
    ReturnRequestCreated {
        return_id: Uuid,
        order_id: Uuid,
        order_number: String,
        reason: String,
    },
    ShipmentCreated {
        shipment_id: Uuid,
        order_id: Uuid,
        recipient: String,
        carrier: String,
        tracking_number: String,
    },
    DisputeOpened {
        order_id: Uuid,
        order_number: String,
    },
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Notification::OrderConfirmation { .. } => "order_confirmation",
            Notification::OrderCancelled { .. } => "order_cancelled",
            Notification::ReturnRequestCreated { .. } => "return_request_created",
            Notification::ShipmentCreated { .. } => "shipment_created",
            Notification::DisputeOpened { .. } => "dispute_opened",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError>;

    /// Dispatches and swallows any failure, logging it. This is the only
    /// entry point the order/return/shipment flows use.
    async fn dispatch_best_effort(&self, notification: Notification) {
        let kind = notification.kind();
        if let Err(e) = self.dispatch(notification).await {
            warn!(kind, error = %e, "Notification dispatch failed; continuing");
        }
    }
}

/// Posts notifications to the email-service endpoint.
pub struct EmailDispatcher {
    client: reqwest::Client,
    endpoint: String,
}

impl EmailDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for EmailDispatcher {
    #[instrument(skip(self, notification))]
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&notification)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Delivery(format!(
                "email service returned {}",
                response.status()
            )));
        }

        info!("Notification delivered");
        Ok(())
    }
}

/// Logs notifications instead of delivering them. Used in development and
/// when no endpoint is configured.
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(kind = notification.kind(), payload = ?notification, "Notification (log only)");
        Ok(())
    }
}
