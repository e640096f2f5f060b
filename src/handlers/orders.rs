use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::order::OrderStatus,
    errors::ServiceError,
    handlers::{AdminUser, AuthUser},
    services::orders::{Actor, CreateOrderRequest, OrderListResponse, OrderResponse},
    AppState,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CancelOrderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CancelOrderResponse {
    pub id: Uuid,
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

// Pagination fields are inlined because serde_urlencoded cannot drive
// numeric fields through #[serde(flatten)].
#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    #[serde(default = "crate::handlers::default_page")]
    pub page: u64,
    #[serde(default = "crate::handlers::default_per_page")]
    pub per_page: u64,
}

/// Checkout. A signed-in customer's id overrides whatever the body claims;
/// without identity headers this is a guest checkout keyed by email.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created, payment intent attached", body = OrderResponse),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient inventory", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Json(mut request): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    match user {
        Some(AuthUser {
            actor: Actor::Customer(id),
        }) => request.customer_id = Some(id),
        // Admins may place an order on behalf of the customer in the body.
        Some(_) => {}
        // An anonymous caller cannot claim someone else's account; the order
        // becomes a guest order keyed by its contact email.
        None => request.customer_id = None,
    }

    let order = state.services.orders.create_order(request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found or not owned by caller", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.services.orders.get_order(id, user.actor).await?;
    Ok(Json(order))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(
        ("status" = Option<String>, Query, description = "Filter by order status"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Orders for the caller (all orders for admins)", body = OrderListResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrderListResponse>, ServiceError> {
    let list = state
        .services
        .orders
        .list_orders(user.actor, query.status, query.page, query.per_page)
        .await?;
    Ok(Json(list))
}

#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CancelOrderRequest,
    responses(
        (status = 200, description = "Order cancelled, stock restored", body = CancelOrderResponse),
        (status = 404, description = "Order not found or not owned by caller", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is past the point of cancellation", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    request: Option<Json<CancelOrderRequest>>,
) -> Result<Json<CancelOrderResponse>, ServiceError> {
    let reason = request.and_then(|Json(r)| r.reason);
    let status = state
        .services
        .orders
        .cancel_order(id, user.actor, reason)
        .await?;
    Ok(Json(CancelOrderResponse { id, status }))
}

/// Admin status override; cancellations route through the full cancellation
/// side effects.
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
        (status = 409, description = "Transition not allowed from the current status", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let order = state.services.orders.update_status(id, request.status).await?;
    Ok(Json(order))
}
