use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::shipment::{self, Entity as ShipmentEntity, Model as ShipmentModel, ShipmentStatus},
    entities::tracking_event::{self, Entity as TrackingEventEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{Notification, NotificationDispatcher},
    services::orders::OrderService,
};

const ESTIMATED_TRANSIT_DAYS: i64 = 5;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateShipmentRequest {
    #[validate(length(min = 1, message = "Carrier is required"))]
    pub carrier: String,
    /// Carrier-issued tracking number; generated locally when absent.
    pub tracking_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct TrackingEventRequest {
    /// Carrier status keyword: "shipped", "in_transit", "delivered", or a
    /// free-form progress note.
    #[validate(length(min = 1, message = "Event status is required"))]
    pub status: String,
    #[validate(length(min = 1, message = "Event description is required"))]
    pub description: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackingEventResponse {
    pub id: Uuid,
    pub status: String,
    pub description: String,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ShipmentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub carrier: String,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub events: Vec<TrackingEventResponse>,
    pub created_at: DateTime<Utc>,
}

/// Manages shipments and their append-only tracking history, and drives the
/// correlated order transitions (first shipment → processing, shipped,
/// delivered).
#[derive(Clone)]
pub struct ShipmentService {
    db: Arc<DbPool>,
    orders: OrderService,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl ShipmentService {
    pub fn new(
        db: Arc<DbPool>,
        orders: OrderService,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            db,
            orders,
            event_sender,
            notifier,
        }
    }

    /// Creates a shipment for an order in `pending` or `processing`.
    ///
    /// Generates a tracking number when the carrier did not supply one,
    /// derives the order's estimated delivery date, and flips a pending
    /// order to processing.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn create_shipment(
        &self,
        order_id: Uuid,
        request: CreateShipmentRequest,
    ) -> Result<ShipmentResponse, ServiceError> {
        request.validate()?;

        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        if !matches!(
            order.status,
            OrderStatus::Pending | OrderStatus::Processing
        ) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Processing,
            });
        }

        let now = Utc::now();
        let tracking_number = request
            .tracking_number
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| generate_tracking_number(&request.carrier));
        let estimated_delivery = now + Duration::days(ESTIMATED_TRANSIT_DAYS);

        let model = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            carrier: Set(request.carrier.clone()),
            tracking_number: Set(tracking_number.clone()),
            status: Set(ShipmentStatus::Pending),
            shipped_at: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        OrderEntity::update_many()
            .col_expr(
                order::Column::EstimatedDelivery,
                Expr::value(Some(estimated_delivery)),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .exec(&*self.db)
            .await?;

        // First shipment flips a pending order to processing; a no-op when
        // the payment webhook got there first.
        self.orders.mark_processing(order_id).await?;

        self.event_sender
            .send(Event::ShipmentCreated {
                shipment_id: created.id,
                order_id,
                tracking_number: tracking_number.clone(),
            })
            .await;

        self.notifier
            .dispatch_best_effort(Notification::ShipmentCreated {
                shipment_id: created.id,
                order_id,
                recipient: order.contact_email.clone(),
                carrier: created.carrier.clone(),
                tracking_number,
            })
            .await;

        info!(shipment_id = %created.id, "Shipment created");
        self.response_for(created).await
    }

    /// Appends a carrier tracking event and applies the correlated order
    /// transition. Events are never mutated or deleted, only appended.
    #[instrument(skip(self, request), fields(shipment_id = %shipment_id))]
    pub async fn append_tracking_event(
        &self,
        shipment_id: Uuid,
        request: TrackingEventRequest,
    ) -> Result<ShipmentResponse, ServiceError> {
        request.validate()?;

        let shipment = self.find_shipment(shipment_id).await?;
        let now = Utc::now();

        // The order transition is validated first so an out-of-order carrier
        // update rejects before anything is written.
        match request.status.as_str() {
            "shipped" | "in_transit" => {
                if shipment.status == ShipmentStatus::Pending {
                    self.orders.mark_shipped(shipment.order_id).await?;
                    self.set_shipment_status(&shipment, ShipmentStatus::InTransit, Some(now), None)
                        .await?;
                }
            }
            "delivered" => {
                if shipment.status == ShipmentStatus::Pending {
                    // Carrier says delivered but the parcel never left:
                    // reject rather than skip states.
                    return Err(ServiceError::InvalidTransition {
                        from: OrderStatus::Processing,
                        to: OrderStatus::Delivered,
                    });
                }
                if shipment.status == ShipmentStatus::InTransit {
                    self.orders.mark_delivered(shipment.order_id).await?;
                    self.set_shipment_status(&shipment, ShipmentStatus::Delivered, None, Some(now))
                        .await?;
                }
            }
            _ => {} // informational event, no transition
        }

        let event = tracking_event::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            status: Set(request.status),
            description: Set(request.description),
            location: Set(request.location),
            occurred_at: Set(now),
        };
        event.insert(&*self.db).await?;

        let refreshed = self.find_shipment(shipment_id).await?;
        self.response_for(refreshed).await
    }

    /// Gets a shipment with its tracking history.
    pub async fn get_shipment(&self, shipment_id: Uuid) -> Result<ShipmentResponse, ServiceError> {
        let shipment = self.find_shipment(shipment_id).await?;
        self.response_for(shipment).await
    }

    /// Shipments for one order, oldest first.
    pub async fn shipments_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<ShipmentResponse>, ServiceError> {
        let shipments = ShipmentEntity::find()
            .filter(shipment::Column::OrderId.eq(order_id))
            .order_by_asc(shipment::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut responses = Vec::with_capacity(shipments.len());
        for shipment in shipments {
            responses.push(self.response_for(shipment).await?);
        }
        Ok(responses)
    }

    async fn find_shipment(&self, shipment_id: Uuid) -> Result<ShipmentModel, ServiceError> {
        ShipmentEntity::find_by_id(shipment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shipment {} not found", shipment_id)))
    }

    async fn set_shipment_status(
        &self,
        shipment: &ShipmentModel,
        status: ShipmentStatus,
        shipped_at: Option<DateTime<Utc>>,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let mut active: shipment::ActiveModel = shipment.clone().into();
        active.status = Set(status);
        if shipped_at.is_some() {
            active.shipped_at = Set(shipped_at);
        }
        if delivered_at.is_some() {
            active.delivered_at = Set(delivered_at);
        }
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        Ok(())
    }

    async fn response_for(&self, shipment: ShipmentModel) -> Result<ShipmentResponse, ServiceError> {
        let events = TrackingEventEntity::find()
            .filter(tracking_event::Column::ShipmentId.eq(shipment.id))
            .order_by_asc(tracking_event::Column::OccurredAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|e| TrackingEventResponse {
                id: e.id,
                status: e.status,
                description: e.description,
                location: e.location,
                occurred_at: e.occurred_at,
            })
            .collect();

        Ok(ShipmentResponse {
            id: shipment.id,
            order_id: shipment.order_id,
            carrier: shipment.carrier,
            tracking_number: shipment.tracking_number,
            status: shipment.status,
            shipped_at: shipment.shipped_at,
            delivered_at: shipment.delivered_at,
            events,
            created_at: shipment.created_at,
        })
    }
}

/// Locally generated tracking number for carriers that do not supply one:
/// a stable carrier prefix plus a pseudo-random alphanumeric suffix.
fn generate_tracking_number(carrier: &str) -> String {
    let prefix: String = carrier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect();
    format!("{}-{}", if prefix.is_empty() { "TRK".to_string() } else { prefix }, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_numbers_carry_a_carrier_prefix() {
        let n = generate_tracking_number("ups");
        assert!(n.starts_with("UPS-"));
        assert_eq!(n.len(), 16);

        let fallback = generate_tracking_number("浪速");
        assert!(fallback.starts_with("TRK-"));
    }

    #[test]
    fn tracking_numbers_are_distinct() {
        assert_ne!(
            generate_tracking_number("dhl"),
            generate_tracking_number("dhl")
        );
    }
}
