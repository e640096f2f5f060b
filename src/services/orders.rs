use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::AppConfig,
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryService,
    services::notifications::{Notification, NotificationDispatcher},
    services::payments::PaymentGateway,
};

/// Identity of the caller performing an order operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer(Uuid),
    Admin,
    /// Internal callers (webhook processor, shipment updates).
    System,
}

impl Actor {
    fn owns(&self, order: &OrderModel) -> bool {
        match self {
            Actor::Customer(id) => order.customer_id == Some(*id),
            Actor::Admin | Actor::System => true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    /// Registered customer placing the order; absent for guest checkout.
    pub customer_id: Option<Uuid>,
    /// Contact address, stored on the order and used as the notification
    /// recipient for registered and guest checkouts alike.
    #[validate(email(message = "A valid contact email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CartItem>,
    #[validate]
    pub shipping_address: ShippingAddress,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    /// Discount applied at checkout, snapshot into the order.
    #[serde(default)]
    pub discount: Option<Decimal>,
}

/// Pre-order, mutable cart entry. At checkout its contents are copied into
/// immutable order line items; cart and order evolve independently after
/// that copy.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Address line is required"))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    pub region: Option<String>,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 2, message = "Country must be a 2-letter code"))]
    pub country: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub contact_email: String,
    pub status: OrderStatus,
    pub subtotal: Decimal,
    pub shipping_cost: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    /// Present only in the checkout response; the client uses it to complete
    /// payment on the gateway's hosted UI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub disputed: bool,
    pub items: Vec<OrderItemResponse>,
    pub estimated_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// The sole authority for order-status transitions and the side effects each
/// transition requires. Every status write is a conditional update guarded
/// on the expected current status, so a transition applies at most once no
/// matter how many callers race.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    config: AppConfig,
    event_sender: EventSender,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        config: AppConfig,
        event_sender: EventSender,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            db,
            config,
            event_sender,
            gateway,
            notifier,
        }
    }

    /// Checkout: reserves inventory, snapshots prices and totals, and creates
    /// the order in `pending`, all in one transaction. The payment intent is
    /// created after commit; if the gateway rejects it the order is cancelled
    /// and stock restored before the error propagates.
    #[instrument(skip(self, request), fields(customer_id = ?request.customer_id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;
        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
        }

        let discount = request.discount.unwrap_or_default();
        if discount < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_number = generate_order_number();

        let txn = self.db.begin().await?;

        // Reserve stock and snapshot name/price for every line before the
        // order becomes visible. An order never exists in `pending` without
        // its items.
        let mut subtotal = Decimal::ZERO;
        let mut item_models = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Product {} not found", item.product_id))
                })?;

            InventoryService::reserve_on(&txn, item.product_id, item.quantity).await?;

            subtotal += product.unit_price * Decimal::from(item.quantity);
            item_models.push(order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(product.id),
                product_name: Set(product.name),
                quantity: Set(item.quantity),
                unit_price: Set(product.unit_price),
            });
        }

        let shipping_cost = match request.shipping_method {
            ShippingMethod::Standard => self.config.standard_shipping_cost,
            ShippingMethod::Express => self.config.express_shipping_cost,
        };
        // Tax is computed independently from the configured rate, never
        // derived by subtraction.
        let tax = (subtotal * Decimal::from_f64(self.config.tax_rate).unwrap_or_default())
            .round_dp(2);
        let total = subtotal + shipping_cost + tax - discount;
        if total < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Discount exceeds the order total".to_string(),
            ));
        }

        let order_model = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number.clone()),
            customer_id: Set(request.customer_id),
            contact_email: Set(request.email.clone()),
            status: Set(OrderStatus::Pending),
            subtotal: Set(subtotal),
            shipping_cost: Set(shipping_cost),
            tax: Set(tax),
            discount: Set(discount),
            total: Set(total),
            currency: Set(self.config.currency.clone()),
            shipping_name: Set(request.shipping_address.name.clone()),
            shipping_line1: Set(request.shipping_address.line1.clone()),
            shipping_line2: Set(request.shipping_address.line2.clone()),
            shipping_city: Set(request.shipping_address.city.clone()),
            shipping_region: Set(request.shipping_address.region.clone()),
            shipping_postal_code: Set(request.shipping_address.postal_code.clone()),
            shipping_country: Set(request.shipping_address.country.clone()),
            payment_intent_id: Set(None),
            disputed: Set(false),
            estimated_delivery: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let order_model = order_model.insert(&txn).await?;
        OrderItemEntity::insert_many(item_models).exec(&txn).await?;
        txn.commit().await?;

        info!(order_id = %order_id, %order_number, %total, "Order created");

        // Payment intent creation happens outside the transaction; on
        // gateway failure the fresh order is rolled back via the normal
        // cancellation path so stock is restored exactly once.
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), order_id.to_string());
        metadata.insert("order_number".to_string(), order_number.clone());

        let intent = match self
            .gateway
            .create_payment_intent(total, &self.config.currency, metadata)
            .await
        {
            Ok(intent) => intent,
            Err(e) => {
                error!(order_id = %order_id, error = %e, "Payment intent creation failed; cancelling order");
                if let Err(cancel_err) = self
                    .cancel_order(order_id, Actor::System, Some("payment setup failed".into()))
                    .await
                {
                    error!(order_id = %order_id, error = %cancel_err, "Rollback cancellation failed");
                }
                return Err(e);
            }
        };

        OrderEntity::update_many()
            .col_expr(
                order::Column::PaymentIntentId,
                Expr::value(Some(intent.id.clone())),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send(Event::OrderCreated {
                order_id,
                order_number: order_number.clone(),
            })
            .await;

        self.notifier
            .dispatch_best_effort(Notification::OrderConfirmation {
                order_id,
                order_number,
                recipient: request.email,
                total,
                currency: self.config.currency.clone(),
            })
            .await;

        let mut response = self.load_response(order_id).await?;
        response.payment_intent_id = Some(intent.id);
        response.client_secret = Some(intent.client_secret);
        Ok(response)
    }

    /// Fetches an order, enforcing that customers only see their own.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
        actor: Actor,
    ) -> Result<OrderResponse, ServiceError> {
        let order = self.find_owned(order_id, actor).await?;
        self.response_for(order).await
    }

    /// Lists orders, newest first. Customers see their own orders; admins
    /// may list all and filter by status.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        actor: Actor,
        status: Option<OrderStatus>,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Actor::Customer(id) = actor {
            query = query.filter(order::Column::CustomerId.eq(id));
        }
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query.paginate(&*self.db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            responses.push(self.response_for(order).await?);
        }

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Cancels an order on behalf of `actor`.
    ///
    /// Legal only from `pending`/`processing`. On the winning transition the
    /// reserved stock of every line item is restored exactly once, the
    /// payment intent is cancelled best-effort, and a cancellation
    /// notification goes out best-effort. Returns the new status.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<OrderStatus, ServiceError> {
        let order = self.find_owned(order_id, actor).await?;

        if !order.status.can_transition(OrderStatus::Cancelled) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        let Some(restored) = self.cancel_and_release(order_id).await? else {
            // Lost the race; report against the status that won.
            let current = self.find_owned(order_id, Actor::System).await?;
            return Err(ServiceError::InvalidTransition {
                from: current.status,
                to: OrderStatus::Cancelled,
            });
        };

        self.cancel_payment_best_effort(&order).await;

        for (product_id, quantity) in restored {
            self.event_sender
                .send(Event::InventoryRestored {
                    product_id,
                    quantity,
                })
                .await;
        }
        self.event_sender
            .send(Event::OrderCancelled { order_id })
            .await;
        self.notifier
            .dispatch_best_effort(Notification::OrderCancelled {
                order_id,
                order_number: order.order_number.clone(),
                recipient: order.contact_email.clone(),
                reason,
            })
            .await;

        info!(order_id = %order_id, "Order cancelled");
        Ok(OrderStatus::Cancelled)
    }

    /// Payment-confirmation transition, invoked by the webhook processor.
    /// Idempotent: an order already past `pending` is left untouched.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, payment_intent_id: &str) -> Result<(), ServiceError> {
        let order = self.find_by_intent(payment_intent_id).await?;

        let applied = self
            .guarded_transition(order.id, &[OrderStatus::Pending], OrderStatus::Processing)
            .await?;
        if applied {
            self.event_sender
                .send(Event::OrderStatusChanged {
                    order_id: order.id,
                    old_status: OrderStatus::Pending,
                    new_status: OrderStatus::Processing,
                })
                .await;
            info!(order_id = %order.id, "Payment confirmed; order processing");
        } else {
            info!(order_id = %order.id, status = %order.status, "Payment confirmation was a no-op");
        }
        Ok(())
    }

    /// Payment-failure transition, invoked by the webhook processor. The
    /// ownership guard is skipped by design; the webhook acts as the system.
    /// Idempotent against gateway retries.
    #[instrument(skip(self))]
    pub async fn fail_payment(&self, payment_intent_id: &str) -> Result<(), ServiceError> {
        let order = self.find_by_intent(payment_intent_id).await?;

        let Some(restored) = self.cancel_and_release(order.id).await? else {
            info!(order_id = %order.id, status = %order.status, "Payment failure was a no-op");
            return Ok(());
        };

        for (product_id, quantity) in restored {
            self.event_sender
                .send(Event::InventoryRestored {
                    product_id,
                    quantity,
                })
                .await;
        }
        self.event_sender
            .send(Event::OrderCancelled { order_id: order.id })
            .await;
        self.notifier
            .dispatch_best_effort(Notification::OrderCancelled {
                order_id: order.id,
                order_number: order.order_number.clone(),
                recipient: order.contact_email.clone(),
                reason: Some("payment failed".to_string()),
            })
            .await;

        info!(order_id = %order.id, "Order cancelled after payment failure");
        Ok(())
    }

    /// Flags an order as disputed. A side-channel flag, never a status
    /// transition, so repeated webhooks are harmless.
    #[instrument(skip(self))]
    pub async fn flag_dispute(&self, payment_intent_id: &str) -> Result<(), ServiceError> {
        let order = self.find_by_intent(payment_intent_id).await?;

        OrderEntity::update_many()
            .col_expr(order::Column::Disputed, Expr::value(true))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send(Event::OrderDisputed { order_id: order.id })
            .await;
        self.notifier
            .dispatch_best_effort(Notification::DisputeOpened {
                order_id: order.id,
                order_number: order.order_number,
            })
            .await;

        warn!(order_id = %order.id, "Order flagged as disputed");
        Ok(())
    }

    /// Flips a pending order to processing when its first shipment is
    /// created. A no-op for orders already processing.
    pub async fn mark_processing(&self, order_id: Uuid) -> Result<(), ServiceError> {
        self.guarded_transition(order_id, &[OrderStatus::Pending], OrderStatus::Processing)
            .await?;
        Ok(())
    }

    /// Shipment tracking moved the parcel out of the warehouse.
    pub async fn mark_shipped(&self, order_id: Uuid) -> Result<(), ServiceError> {
        self.strict_transition(order_id, OrderStatus::Processing, OrderStatus::Shipped)
            .await
    }

    /// Carrier confirmed delivery.
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<(), ServiceError> {
        self.strict_transition(order_id, OrderStatus::Shipped, OrderStatus::Delivered)
            .await
    }

    /// Marks a delivered order as returned; called by the return-approval
    /// flow only.
    pub async fn mark_returned(&self, order_id: Uuid) -> Result<(), ServiceError> {
        self.strict_transition(order_id, OrderStatus::Delivered, OrderStatus::Returned)
            .await
    }

    /// Admin-facing status update; routes cancellations through the full
    /// cancellation side effects and everything else through the strict
    /// transition table.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        match new_status {
            OrderStatus::Cancelled => {
                self.cancel_order(order_id, Actor::Admin, None).await?;
            }
            OrderStatus::Processing => {
                self.strict_transition(order_id, OrderStatus::Pending, OrderStatus::Processing)
                    .await?
            }
            OrderStatus::Shipped => self.mark_shipped(order_id).await?,
            OrderStatus::Delivered => self.mark_delivered(order_id).await?,
            OrderStatus::Returned => self.mark_returned(order_id).await?,
            OrderStatus::Pending => {
                let current = self.find_owned(order_id, Actor::System).await?;
                return Err(ServiceError::InvalidTransition {
                    from: current.status,
                    to: OrderStatus::Pending,
                });
            }
        }
        self.load_response(order_id).await
    }

    // ---- internal helpers ----

    /// Conditional status update: applies `to` only when the current status
    /// is one of `from`. Returns whether this caller won the write. This is
    /// the idempotency mechanism for webhook retries and racing confirmers.
    async fn guarded_transition(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool, ServiceError> {
        Self::guarded_transition_on(&*self.db, order_id, from, to).await
    }

    async fn guarded_transition_on<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool, ServiceError> {
        let result = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(to))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.is_in(from.iter().copied()))
            .exec(conn)
            .await?;

        Ok(result.rows_affected > 0)
    }

    /// Transition that must succeed from exactly `from`, otherwise reports
    /// `InvalidTransition` against the actual current status.
    async fn strict_transition(
        &self,
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), ServiceError> {
        let applied = self.guarded_transition(order_id, &[from], to).await?;
        if applied {
            self.event_sender
                .send(Event::OrderStatusChanged {
                    order_id,
                    old_status: from,
                    new_status: to,
                })
                .await;
            return Ok(());
        }
        let current = self.find_owned(order_id, Actor::System).await?;
        Err(ServiceError::InvalidTransition {
            from: current.status,
            to,
        })
    }

    /// Applies the cancellation transition and restores the full reserved
    /// quantity of every line item in a single transaction, so the status
    /// flip and the stock restores land or roll back together. Returns
    /// `None` when another caller already owns the transition (nothing was
    /// written), or the restored `(product_id, quantity)` pairs when this
    /// caller won.
    async fn cancel_and_release(
        &self,
        order_id: Uuid,
    ) -> Result<Option<Vec<(Uuid, i32)>>, ServiceError> {
        let txn = self.db.begin().await?;

        let applied = Self::guarded_transition_on(
            &txn,
            order_id,
            &OrderStatus::cancellable(),
            OrderStatus::Cancelled,
        )
        .await?;
        if !applied {
            txn.rollback().await?;
            return Ok(None);
        }

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&txn)
            .await?;
        let mut restored = Vec::with_capacity(items.len());
        for item in items {
            InventoryService::restore_on(&txn, item.product_id, item.quantity).await?;
            restored.push((item.product_id, item.quantity));
        }

        txn.commit().await?;
        Ok(Some(restored))
    }

    /// Best-effort payment-intent cancellation. Gateway failures are logged
    /// and swallowed; reconciliation happens via the next webhook delivery.
    async fn cancel_payment_best_effort(&self, order: &OrderModel) {
        let Some(intent_id) = &order.payment_intent_id else {
            return;
        };
        if let Err(e) = self.gateway.cancel_payment_intent(intent_id).await {
            warn!(
                order_id = %order.id,
                error = %e,
                "Payment-intent cancellation failed; order cancellation proceeds"
            );
        }
    }

    async fn find_owned(&self, order_id: Uuid, actor: Actor) -> Result<OrderModel, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        // Orders that exist but belong to someone else are indistinguishable
        // from missing ones for customers.
        if !actor.owns(&order) {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }
        Ok(order)
    }

    async fn find_by_intent(&self, payment_intent_id: &str) -> Result<OrderModel, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::PaymentIntentId.eq(payment_intent_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "No order for payment intent {}",
                    payment_intent_id
                ))
            })
    }

    async fn load_response(&self, order_id: Uuid) -> Result<OrderResponse, ServiceError> {
        let order = self.find_owned(order_id, Actor::System).await?;
        self.response_for(order).await
    }

    async fn response_for(&self, order: OrderModel) -> Result<OrderResponse, ServiceError> {
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id,
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        Ok(OrderResponse {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            contact_email: order.contact_email,
            status: order.status,
            subtotal: order.subtotal,
            shipping_cost: order.shipping_cost,
            tax: order.tax,
            discount: order.discount,
            total: order.total,
            currency: order.currency,
            payment_intent_id: order.payment_intent_id,
            client_secret: None,
            disputed: order.disputed,
            items,
            estimated_delivery: order.estimated_delivery,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}

/// Random, prefixed order number shown to the customer.
fn generate_order_number() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("ORD-{}", suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_are_prefixed_and_unique_enough() {
        let a = generate_order_number();
        let b = generate_order_number();
        assert!(a.starts_with("ORD-"));
        assert_eq!(a.len(), 14);
        assert_ne!(a, b);
    }

    #[test]
    fn customer_actor_only_owns_own_orders() {
        let customer = Uuid::new_v4();
        let order = sample_order(Some(customer));

        assert!(Actor::Customer(customer).owns(&order));
        assert!(!Actor::Customer(Uuid::new_v4()).owns(&order));
        assert!(Actor::Admin.owns(&order));
        assert!(Actor::System.owns(&order));
    }

    #[test]
    fn guest_orders_are_not_owned_by_any_customer() {
        let order = sample_order(None);
        assert!(!Actor::Customer(Uuid::new_v4()).owns(&order));
        assert!(Actor::Admin.owns(&order));
    }

    fn sample_order(customer_id: Option<Uuid>) -> OrderModel {
        let now = Utc::now();
        OrderModel {
            id: Uuid::new_v4(),
            order_number: "ORD-TEST000001".to_string(),
            customer_id,
            contact_email: "shopper@example.com".to_string(),
            status: OrderStatus::Pending,
            subtotal: Decimal::new(1000, 2),
            shipping_cost: Decimal::new(500, 2),
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::new(1500, 2),
            currency: "USD".to_string(),
            shipping_name: "Test Person".to_string(),
            shipping_line1: "1 Main St".to_string(),
            shipping_line2: None,
            shipping_city: "Springfield".to_string(),
            shipping_region: None,
            shipping_postal_code: "00001".to_string(),
            shipping_country: "US".to_string(),
            payment_intent_id: None,
            disputed: false,
            estimated_delivery: None,
            created_at: now,
            updated_at: now,
        }
    }
}
