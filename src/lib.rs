use std::sync::Arc;

use axum::Router;

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod services;

use services::{
    inventory::InventoryService,
    notifications::NotificationDispatcher,
    orders::OrderService,
    payments::PaymentGateway,
    returns::ReturnService,
    shipments::ShipmentService,
    webhooks::WebhookProcessor,
};

/// Services exposed to HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: OrderService,
    pub inventory: InventoryService,
    pub returns: ReturnService,
    pub shipments: ShipmentService,
    pub webhooks: WebhookProcessor,
}

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: AppServices,
}

impl AppState {
    /// Wires the full service graph over one database handle. The gateway
    /// and notifier are injected so tests can substitute recording fakes.
    pub fn build(
        db: Arc<db::DbPool>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let orders = OrderService::new(
            db.clone(),
            config.clone(),
            event_sender.clone(),
            gateway,
            notifier.clone(),
        );
        let inventory = InventoryService::new(db.clone(), event_sender.clone());
        let returns = ReturnService::new(
            db.clone(),
            orders.clone(),
            event_sender.clone(),
            notifier.clone(),
            config.return_window_days,
        );
        let shipments = ShipmentService::new(
            db.clone(),
            orders.clone(),
            event_sender.clone(),
            notifier,
        );
        let webhooks = WebhookProcessor::new(
            orders.clone(),
            config.payment_webhook_secret.clone(),
            config.payment_webhook_tolerance_secs,
        );

        Self {
            db,
            config,
            event_sender,
            services: AppServices {
                orders,
                inventory,
                returns,
                shipments,
                webhooks,
            },
        }
    }
}

/// The complete application router: versioned API plus swagger UI.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", handlers::api_v1_routes())
        .merge(openapi::swagger_ui())
        .with_state(state)
}
