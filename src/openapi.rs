use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    entities::{order::OrderStatus, return_request::ReturnStatus, shipment::ShipmentStatus},
    errors::ErrorResponse,
    handlers,
    services::{orders, returns, shipments},
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = "Checkout, order lifecycle, payments, returns, and shipment tracking \
                       for the storefront. Caller identity arrives as `x-user-id` / \
                       `x-user-role` headers set by the identity layer in front of this API."
    ),
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::cancel_order,
        handlers::orders::update_order_status,
        handlers::returns::create_return,
        handlers::returns::approve_return,
        handlers::returns::reject_return,
        handlers::returns::complete_return,
        handlers::returns::get_return,
        handlers::returns::list_returns,
        handlers::shipments::create_shipment,
        handlers::shipments::append_tracking_event,
        handlers::shipments::get_shipment,
        handlers::shipments::list_order_shipments,
        handlers::webhooks::handle_payment_webhook,
    ),
    components(schemas(
        ErrorResponse,
        OrderStatus,
        ReturnStatus,
        ShipmentStatus,
        orders::CreateOrderRequest,
        orders::CartItem,
        orders::ShippingAddress,
        orders::ShippingMethod,
        orders::OrderItemResponse,
        orders::OrderResponse,
        orders::OrderListResponse,
        handlers::orders::CancelOrderRequest,
        handlers::orders::CancelOrderResponse,
        handlers::orders::UpdateStatusRequest,
        handlers::returns::CreateReturnRequest,
        handlers::returns::ReturnListResponse,
        returns::ReturnResponse,
        shipments::CreateShipmentRequest,
        shipments::TrackingEventRequest,
        shipments::TrackingEventResponse,
        shipments::ShipmentResponse,
    )),
    tags(
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "returns", description = "Return requests and resolution"),
        (name = "shipments", description = "Fulfillment and carrier tracking"),
        (name = "webhooks", description = "Inbound payment-gateway events"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/docs`, serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
