use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::{AdminUser, AuthUser, PaginationParams},
    services::orders::Actor,
    services::returns::ReturnResponse,
    AppState,
};

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateReturnRequest {
    #[validate(length(min = 1, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReturnListResponse {
    pub returns: Vec<ReturnResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Files a return for a delivered order. Customers only; ownership is
/// enforced against the caller's id.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/returns",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = CreateReturnRequest,
    responses(
        (status = 201, description = "Return request filed", body = ReturnResponse),
        (status = 400, description = "Return window expired or reason missing", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found or not owned by caller", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order not delivered, or a return is already open", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn create_return(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CreateReturnRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;
    let Actor::Customer(customer_id) = user.actor else {
        return Err(ServiceError::ValidationError(
            "Returns are filed by the customer who placed the order".to_string(),
        ));
    };

    let created = state
        .services
        .returns
        .create_return_request(order_id, customer_id, request.reason)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/approve",
    params(("id" = Uuid, Path, description = "Return request id")),
    responses(
        (status = 200, description = "Return approved; order marked returned", body = ReturnResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order left the delivered state", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn approve_return(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ServiceError> {
    Ok(Json(state.services.returns.approve_return(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/reject",
    params(("id" = Uuid, Path, description = "Return request id")),
    responses(
        (status = 200, description = "Return rejected; order untouched", body = ReturnResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn reject_return(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ServiceError> {
    Ok(Json(state.services.returns.reject_return(id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/returns/{id}/complete",
    params(("id" = Uuid, Path, description = "Return request id")),
    responses(
        (status = 200, description = "Goods received; return completed", body = ReturnResponse),
        (status = 400, description = "Return is not in the approved state", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn complete_return(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ServiceError> {
    Ok(Json(state.services.returns.complete_return(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/returns/{id}",
    params(("id" = Uuid, Path, description = "Return request id")),
    responses(
        (status = 200, description = "Return request", body = ReturnResponse),
        (status = 404, description = "Return request not found", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn get_return(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ReturnResponse>, ServiceError> {
    Ok(Json(state.services.returns.get_return(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/returns",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Return requests, newest first", body = ReturnListResponse),
        (status = 403, description = "Caller is not an admin", body = crate::errors::ErrorResponse),
    ),
    tag = "returns"
)]
pub async fn list_returns(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<ReturnListResponse>, ServiceError> {
    let (returns, total) = state
        .services
        .returns
        .list_returns(pagination.page, pagination.per_page)
        .await?;
    Ok(Json(ReturnListResponse {
        returns,
        total,
        page: pagination.page,
        per_page: pagination.per_page,
    }))
}
