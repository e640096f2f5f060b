use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

use storefront_api::{
    config::AppConfig,
    db,
    entities::product,
    errors::ServiceError,
    events,
    services::notifications::{Notification, NotificationDispatcher, NotificationError},
    services::orders::{CartItem, CreateOrderRequest, ShippingAddress, ShippingMethod},
    services::payments::{PaymentGateway, PaymentIntent},
    services::webhooks::sign_payload,
    AppState,
};

/// Payment gateway double. Records every call and can be told to fail
/// either operation.
pub struct MockGateway {
    counter: AtomicUsize,
    pub created: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    pub fail_create: AtomicBool,
    pub fail_cancel: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            counter: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            fail_cancel: AtomicBool::new(false),
        })
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn cancelled_intents(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        _amount: Decimal,
        _currency: &str,
        _metadata: HashMap<String, String>,
    ) -> Result<PaymentIntent, ServiceError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ServiceError::GatewayError("gateway down".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let id = format!("pi_test_{}", n);
        self.created.lock().unwrap().push(id.clone());
        Ok(PaymentIntent {
            client_secret: format!("{}_secret", id),
            id,
        })
    }

    async fn cancel_payment_intent(&self, intent_id: &str) -> Result<(), ServiceError> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(ServiceError::GatewayError("gateway down".to_string()));
        }
        self.cancelled.lock().unwrap().push(intent_id.to_string());
        Ok(())
    }
}

/// Notification double that records what would have been sent.
pub struct RecordingDispatcher {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, notification: Notification) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Full application wired over in-memory SQLite with recording doubles for
/// the gateway and notifier.
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
    pub notifier: Arc<RecordingDispatcher>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = Arc::new(
            db::establish_connection("sqlite::memory:")
                .await
                .expect("in-memory sqlite"),
        );
        db::create_schema(&db).await.expect("schema bootstrap");

        let config = AppConfig::for_tests("sqlite::memory:");
        let (event_sender, event_rx) = events::channel(256);
        tokio::spawn(events::process_events(event_rx));

        let gateway = MockGateway::new();
        let notifier = RecordingDispatcher::new();
        let state = AppState::build(
            db,
            config,
            event_sender,
            gateway.clone(),
            notifier.clone(),
        );

        Self {
            state,
            gateway,
            notifier,
        }
    }

    pub async fn seed_product(&self, name: &str, unit_price: Decimal, available: i32) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let model = product::ActiveModel {
            id: Set(id),
            sku: Set(format!("SKU-{}", id.simple())),
            name: Set(name.to_string()),
            unit_price: Set(unit_price),
            currency: Set("USD".to_string()),
            available: Set(available),
            created_at: Set(now),
            updated_at: Set(now),
        };
        model.insert(&*self.state.db).await.expect("seed product");
        id
    }

    pub async fn available_stock(&self, product_id: Uuid) -> i32 {
        use sea_orm::EntityTrait;
        product::Entity::find_by_id(product_id)
            .one(&*self.state.db)
            .await
            .expect("query product")
            .expect("product exists")
            .available
    }

    /// Signs `payload` the way the gateway would, with the test secret.
    pub fn sign_webhook(&self, payload: &[u8]) -> String {
        let secret = self
            .state
            .config
            .payment_webhook_secret
            .as_deref()
            .expect("test config has a webhook secret");
        sign_payload(secret, Utc::now().timestamp(), payload)
    }
}

pub fn checkout_request(
    customer_id: Option<Uuid>,
    items: Vec<(Uuid, i32)>,
) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_id,
        email: "shopper@example.com".to_string(),
        items: items
            .into_iter()
            .map(|(product_id, quantity)| CartItem {
                product_id,
                quantity,
            })
            .collect(),
        shipping_address: ShippingAddress {
            name: "Pat Shopper".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            region: Some("IL".to_string()),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
        },
        shipping_method: ShippingMethod::Standard,
        discount: None,
    }
}

pub fn webhook_body(event_type: &str, intent_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": event_type,
        "data": { "object": { "id": intent_id } }
    }))
    .expect("serialize webhook body")
}
