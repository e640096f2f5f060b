mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::TestApp;
use storefront_api::app_router;

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn checkout_json(product_id: Uuid, quantity: i32) -> Value {
    json!({
        "email": "shopper@example.com",
        "items": [{ "product_id": product_id, "quantity": quantity }],
        "shipping_address": {
            "name": "Pat Shopper",
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "62701",
            "country": "US"
        },
        "shipping_method": "standard"
    })
}

#[tokio::test]
async fn guest_checkout_over_http_returns_the_order_with_its_secret() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;

    let response = app_router(app.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(checkout_json(product, 2).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["total"], "44.98");
    assert_eq!(body["contact_email"], "shopper@example.com");
    assert!(body["customer_id"].is_null());
    assert!(body["client_secret"].is_string());
    assert_eq!(app.available_stock(product).await, 3);
}

#[tokio::test]
async fn anonymous_checkout_cannot_claim_a_customer_account() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;
    let victim = Uuid::new_v4();
    let router = app_router(app.state.clone());

    // No identity headers, but the body claims someone else's account.
    let mut checkout = checkout_json(product, 1);
    checkout["customer_id"] = json!(victim.to_string());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(checkout.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert!(body["customer_id"].is_null());
    assert_eq!(body["contact_email"], "shopper@example.com");
    let order_id = body["id"].as_str().unwrap().to_string();

    // The claimed customer does not own the guest order.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{order_id}"))
                .header("x-user-id", victim.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // And it never shows up in their order list.
    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/orders")
                .header("x-user-id", victim.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["total"], json!(0));
}

#[tokio::test]
async fn signed_in_checkout_binds_the_order_to_the_caller() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;
    let customer = Uuid::new_v4();
    let router = app_router(app.state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", customer.to_string())
                .body(Body::from(checkout_json(product, 1).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["customer_id"], customer.to_string());
    let order_id = body["id"].as_str().unwrap().to_string();

    // The owner can read it back.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{order_id}"))
                .header("x-user-id", customer.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Another customer sees a 404, not a 403.
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{order_id}"))
                .header("x-user-id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // An admin can always read it.
    let response = router
        .oneshot(
            Request::builder()
                .uri(format!("/api/v1/orders/{order_id}"))
                .header("x-user-role", "admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn cancellation_endpoint_returns_the_new_status() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;
    let customer = Uuid::new_v4();
    let router = app_router(app.state.clone());

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", customer.to_string())
                .body(Body::from(checkout_json(product, 2).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let order_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/orders/{order_id}/cancel"))
                .header(header::CONTENT_TYPE, "application/json")
                .header("x-user-id", customer.to_string())
                .body(Body::from(json!({ "reason": "ordered twice" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "cancelled");
    assert_eq!(app.available_stock(product).await, 5);

    // Cancelling again is a conflict with a JSON error body.
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/v1/orders/{order_id}/cancel"))
                .header("x-user-id", customer.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Conflict");
    assert!(body["message"].as_str().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn validation_failures_return_bad_request() {
    let app = TestApp::new().await;
    let product = app.seed_product("Desk Lamp", dec!(19.99), 5).await;

    let mut body = checkout_json(product, 1);
    body["email"] = json!("not-an-email");

    let response = app_router(app.state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/orders")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.available_stock(product).await, 5);
}
