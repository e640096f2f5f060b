use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};

use crate::{errors::ServiceError, AppState};

/// Payment-gateway webhook endpoint. No identity headers; authenticity comes
/// from the HMAC signature over the raw body, so the payload is taken as
/// bytes before any JSON parsing.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payments",
    request_body(content = String, description = "Raw signed event payload"),
    responses(
        (status = 200, description = "Event accepted (including unrecognized types)"),
        (status = 401, description = "Missing, stale, or invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "No order for the referenced payment intent", body = crate::errors::ErrorResponse),
    ),
    tag = "webhooks"
)]
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    state.services.webhooks.process(&body, signature).await?;
    Ok(Json(json!({ "received": true })))
}
