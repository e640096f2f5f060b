mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use rust_decimal_macros::dec;
use tower::ServiceExt;
use uuid::Uuid;

use common::{checkout_request, webhook_body, TestApp};
use storefront_api::{
    app_router,
    entities::order::OrderStatus,
    services::orders::{Actor, OrderResponse},
    services::webhooks::sign_payload,
};

async fn place_order(app: &TestApp) -> (Uuid, OrderResponse) {
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;
    let order = app
        .state
        .services
        .orders
        .create_order(checkout_request(None, vec![(product, 2)]))
        .await
        .unwrap();
    (product, order)
}

async fn deliver(app: &TestApp, body: Vec<u8>, signature: Option<String>) -> StatusCode {
    let router = app_router(app.state.clone());
    let mut request = Request::builder()
        .method("POST")
        .uri("/api/v1/webhooks/payments")
        .header("content-type", "application/json");
    if let Some(sig) = signature {
        request = request.header("stripe-signature", sig);
    }
    let response = router
        .oneshot(request.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    response.status()
}

async fn current_status(app: &TestApp, order_id: Uuid) -> OrderStatus {
    app.state
        .services
        .orders
        .get_order(order_id, Actor::System)
        .await
        .unwrap()
        .status
}

#[tokio::test]
async fn duplicate_success_events_advance_the_order_once() {
    let app = TestApp::new().await;
    let (_, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();

    let body = webhook_body("payment_intent.succeeded", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body.clone(), Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Processing);

    // The retry signs the same payload again and must be a 200 no-op.
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Processing);
}

#[tokio::test]
async fn duplicate_failure_events_restore_stock_exactly_once() {
    let app = TestApp::new().await;
    let (product, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();
    assert_eq!(app.available_stock(product).await, 3);

    let body = webhook_body("payment_intent.payment_failed", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body.clone(), Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Cancelled);
    assert_eq!(app.available_stock(product).await, 5);

    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);
    assert_eq!(app.available_stock(product).await, 5);
}

#[tokio::test]
async fn success_after_failure_does_not_resurrect_the_order() {
    let app = TestApp::new().await;
    let (_, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();

    let body = webhook_body("payment_intent.canceled", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Cancelled);

    // A late success for the same intent is ignored.
    let body = webhook_body("payment_intent.succeeded", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Cancelled);
}

#[tokio::test]
async fn bad_signatures_are_rejected_without_state_changes() {
    let app = TestApp::new().await;
    let (product, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();
    let body = webhook_body("payment_intent.payment_failed", &intent);

    // Missing header.
    assert_eq!(
        deliver(&app, body.clone(), None).await,
        StatusCode::UNAUTHORIZED
    );

    // Wrong secret.
    let sig = sign_payload("whsec_wrong", Utc::now().timestamp(), &body);
    assert_eq!(
        deliver(&app, body.clone(), Some(sig)).await,
        StatusCode::UNAUTHORIZED
    );

    // Stale timestamp.
    let secret = app.state.config.payment_webhook_secret.clone().unwrap();
    let sig = sign_payload(&secret, Utc::now().timestamp() - 3600, &body);
    assert_eq!(
        deliver(&app, body, Some(sig)).await,
        StatusCode::UNAUTHORIZED
    );

    assert_eq!(current_status(&app, order.id).await, OrderStatus::Pending);
    assert_eq!(app.available_stock(product).await, 3);
}

#[tokio::test]
async fn unknown_event_types_are_acknowledged() {
    let app = TestApp::new().await;
    let (_, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();

    let body = webhook_body("invoice.finalized", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);
    assert_eq!(current_status(&app, order.id).await, OrderStatus::Pending);
}

#[tokio::test]
async fn dispute_events_flag_the_order_without_a_transition() {
    let app = TestApp::new().await;
    let (_, order) = place_order(&app).await;
    let intent = order.payment_intent_id.clone().unwrap();

    let body = webhook_body("payment_intent.succeeded", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);

    let body = webhook_body("charge.dispute.created", &intent);
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::OK);

    let refreshed = app
        .state
        .services
        .orders
        .get_order(order.id, Actor::System)
        .await
        .unwrap();
    assert!(refreshed.disputed);
    assert_eq!(refreshed.status, OrderStatus::Processing);
}

#[tokio::test]
async fn events_for_unknown_intents_return_not_found() {
    let app = TestApp::new().await;

    let body = webhook_body("payment_intent.succeeded", "pi_never_seen");
    let sig = app.sign_webhook(&body);
    assert_eq!(deliver(&app, body, Some(sig)).await, StatusCode::NOT_FOUND);
}
