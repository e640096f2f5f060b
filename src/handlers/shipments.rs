use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    errors::ServiceError,
    handlers::{AdminUser, AuthUser},
    services::shipments::{
        CreateShipmentRequest, ShipmentResponse, TrackingEventRequest,
    },
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/shipments",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created; pending order moved to processing", body = ShipmentResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is past fulfillment", body = crate::errors::ErrorResponse),
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CreateShipmentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let shipment = state
        .services
        .shipments
        .create_shipment(order_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// Carrier update feed. "shipped"/"in_transit" and "delivered" drive the
/// order state machine; anything else is informational.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/events",
    params(("id" = Uuid, Path, description = "Shipment id")),
    request_body = TrackingEventRequest,
    responses(
        (status = 200, description = "Event appended", body = ShipmentResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Out-of-order carrier update", body = crate::errors::ErrorResponse),
    ),
    tag = "shipments"
)]
pub async fn append_tracking_event(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(shipment_id): Path<Uuid>,
    Json(request): Json<TrackingEventRequest>,
) -> Result<Json<ShipmentResponse>, ServiceError> {
    let shipment = state
        .services
        .shipments
        .append_tracking_event(shipment_id, request)
        .await?;
    Ok(Json(shipment))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    params(("id" = Uuid, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Shipment with tracking history", body = ShipmentResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ShipmentResponse>, ServiceError> {
    Ok(Json(state.services.shipments.get_shipment(id).await?))
}

/// Shipments for an order. Customers may only list shipments of orders
/// they own; the ownership check rides on the order lookup.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/shipments",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Shipments, oldest first", body = [ShipmentResponse]),
        (status = 404, description = "Order not found or not owned by caller", body = crate::errors::ErrorResponse),
    ),
    tag = "shipments"
)]
pub async fn list_order_shipments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<ShipmentResponse>>, ServiceError> {
    state.services.orders.get_order(order_id, user.actor).await?;
    Ok(Json(
        state
            .services
            .shipments
            .shipments_for_order(order_id)
            .await?,
    ))
}
