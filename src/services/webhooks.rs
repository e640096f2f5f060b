use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{info, instrument, warn};

use crate::{errors::ServiceError, services::orders::OrderService};

type HmacSha256 = Hmac<Sha256>;

/// Incoming event envelope from the payment gateway:
/// `{ "id": ..., "type": ..., "data": { "object": { "id": intent-id } } }`.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    /// The payment-intent identifier the event refers to.
    pub id: String,
}

/// Translates asynchronous payment-gateway events into order-state-machine
/// calls.
///
/// The gateway retries any delivery that does not get a 2xx, so every
/// handler tolerates repeat invocations: idempotency comes from the order
/// service's status-guarded conditional updates, never from unconditional
/// writes.
#[derive(Clone)]
pub struct WebhookProcessor {
    orders: OrderService,
    secret: Option<String>,
    tolerance_secs: u64,
}

impl WebhookProcessor {
    pub fn new(orders: OrderService, secret: Option<String>, tolerance_secs: u64) -> Self {
        Self {
            orders,
            secret,
            tolerance_secs,
        }
    }

    /// Verifies the payload signature, then applies the event. Returns
    /// `InvalidSignature` (and performs no state change) when verification
    /// fails.
    #[instrument(skip(self, payload, signature_header))]
    pub async fn process(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> Result<(), ServiceError> {
        if let Some(secret) = &self.secret {
            let header = signature_header.ok_or(ServiceError::InvalidSignature)?;
            self.verify_signature(payload, header, secret)?;
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(payload)
            .map_err(|e| ServiceError::ValidationError(format!("invalid webhook body: {}", e)))?;

        self.apply(&envelope).await
    }

    /// Dispatches one verified event by type. Unrecognized types are
    /// accepted without effect so the gateway stops retrying them.
    async fn apply(&self, envelope: &WebhookEnvelope) -> Result<(), ServiceError> {
        let intent_id = envelope.data.object.id.as_str();
        match envelope.event_type.as_str() {
            "payment_intent.succeeded" => self.orders.confirm_payment(intent_id).await,
            "payment_intent.payment_failed" | "payment_intent.canceled" => {
                self.orders.fail_payment(intent_id).await
            }
            "charge.dispute.created" => self.orders.flag_dispute(intent_id).await,
            other => {
                info!(event_type = other, event_id = ?envelope.id, "Unhandled webhook event type");
                Ok(())
            }
        }
    }

    /// Stripe-style signature: header `t=<unix-ts>,v1=<hex hmac>`, where the
    /// MAC is HMAC-SHA256 over `"{t}.{payload}"` with the shared secret.
    /// Stale timestamps outside the tolerance are rejected to blunt replay.
    fn verify_signature(
        &self,
        payload: &[u8],
        header: &str,
        secret: &str,
    ) -> Result<(), ServiceError> {
        let mut timestamp = "";
        let mut signature = "";
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value,
                Some(("v1", value)) => signature = value,
                _ => {}
            }
        }
        if timestamp.is_empty() || signature.is_empty() {
            warn!("Webhook signature header missing t= or v1= component");
            return Err(ServiceError::InvalidSignature);
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| ServiceError::InvalidSignature)?;
        let now = Utc::now().timestamp();
        if (now - ts).unsigned_abs() > self.tolerance_secs {
            warn!(timestamp = ts, "Webhook signature timestamp outside tolerance");
            return Err(ServiceError::InvalidSignature);
        }

        let provided = hex::decode(signature).map_err(|_| ServiceError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| ServiceError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        // verify_slice is constant-time.
        mac.verify_slice(&provided)
            .map_err(|_| ServiceError::InvalidSignature)
    }
}

/// Computes the signature header value for a payload, shared with the test
/// harness so tests sign exactly like the gateway does.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("t={},v1={}", timestamp, signature)
}
