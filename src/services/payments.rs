use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument};

use crate::errors::ServiceError;

/// A payment attempt in progress at the external gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway identifier, stored on the order as its payment reference.
    pub id: String,
    /// Secret handed to the client to complete payment on the gateway's
    /// hosted UI.
    pub client_secret: String,
}

/// Thin wrapper around the external payment processor. All transport and
/// decline failures surface as `ServiceError::GatewayError`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, ServiceError>;

    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<(), ServiceError>;
}

/// REST client for the hosted payment gateway.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct CreateIntentRequest<'a> {
    /// Amount in minor units, per gateway convention.
    amount: i64,
    currency: &'a str,
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }

    /// Converts a decimal amount to the gateway's minor units (cents).
    fn minor_units(amount: Decimal) -> Result<i64, ServiceError> {
        let cents = (amount * Decimal::from(100)).round();
        cents.to_i64().ok_or_else(|| {
            ServiceError::GatewayError(format!("Amount {} out of gateway range", amount))
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self, metadata), fields(amount = %amount, currency))]
    async fn create_payment_intent(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, ServiceError> {
        let body = CreateIntentRequest {
            amount: Self::minor_units(amount)?,
            currency,
            metadata,
        };

        let url = format!("{}/payment_intents", self.base_url);
        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("create intent failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::GatewayError(format!(
                "create intent returned {}: {}",
                status, detail
            )));
        }

        let intent: IntentResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("invalid intent response: {}", e)))?;

        info!(intent_id = %intent.id, "Payment intent created");
        Ok(PaymentIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }

    #[instrument(skip(self))]
    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<(), ServiceError> {
        let url = format!("{}/payment_intents/{}/cancel", self.base_url, intent_id);
        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .map_err(|e| ServiceError::GatewayError(format!("cancel intent failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(ServiceError::GatewayError(format!(
                "cancel intent returned {}: {}",
                status, detail
            )));
        }

        info!("Payment intent cancelled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_rounds_to_cents() {
        assert_eq!(HttpPaymentGateway::minor_units(dec!(12.34)).unwrap(), 1234);
        assert_eq!(HttpPaymentGateway::minor_units(dec!(0.005)).unwrap(), 0);
        assert_eq!(HttpPaymentGateway::minor_units(dec!(100)).unwrap(), 10000);
    }
}
