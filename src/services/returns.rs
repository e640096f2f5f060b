use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set, SqlErr};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::OrderStatus,
    entities::return_request::{self, Entity as ReturnEntity, Model as ReturnModel, ReturnStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::notifications::{Notification, NotificationDispatcher},
    services::orders::{Actor, OrderService},
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReturnResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub status: ReturnStatus,
    pub reason: String,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

impl From<ReturnModel> for ReturnResponse {
    fn from(model: ReturnModel) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            customer_id: model.customer_id,
            status: model.status,
            reason: model.reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Manages return requests and drives the delivered → returned transition
/// through the order service when a request is approved.
#[derive(Clone)]
pub struct ReturnService {
    db: Arc<DbPool>,
    orders: OrderService,
    event_sender: EventSender,
    notifier: Arc<dyn NotificationDispatcher>,
    return_window_days: i64,
}

impl ReturnService {
    pub fn new(
        db: Arc<DbPool>,
        orders: OrderService,
        event_sender: EventSender,
        notifier: Arc<dyn NotificationDispatcher>,
        return_window_days: i64,
    ) -> Self {
        Self {
            db,
            orders,
            event_sender,
            notifier,
            return_window_days,
        }
    }

    /// Files a return request for a delivered order.
    ///
    /// Four independent preconditions, each with its own rejection message:
    /// the order exists and belongs to the caller; it is `delivered`; it is
    /// inside the return window counted from `created_at`; and no other
    /// return request is still open for it.
    #[instrument(skip(self, reason), fields(order_id = %order_id, customer_id = %customer_id))]
    pub async fn create_return_request(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        reason: String,
    ) -> Result<ReturnResponse, ServiceError> {
        if reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "A reason is required to request a return".to_string(),
            ));
        }

        let order = self
            .orders
            .get_order(order_id, Actor::Customer(customer_id))
            .await?;

        if order.status != OrderStatus::Delivered {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Returned,
            });
        }

        let window = Duration::days(self.return_window_days);
        if Utc::now() - order.created_at > window {
            return Err(ServiceError::ReturnWindowExpired(format!(
                "Order {} was created more than {} days ago and can no longer be returned",
                order.order_number, self.return_window_days
            )));
        }

        let now = Utc::now();
        let model = return_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            customer_id: Set(customer_id),
            status: Set(ReturnStatus::Pending),
            reason: Set(reason.clone()),
            // The unique index on this column is what enforces at most one
            // open request per order; a plain existence check would race.
            open_for_order: Set(Some(order_id)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = match model.insert(&*self.db).await {
            Ok(created) => created,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(ServiceError::DuplicateReturnRequest(format!(
                    "A return request for order {} is already being processed",
                    order.order_number
                )));
            }
            Err(e) => return Err(e.into()),
        };

        info!(return_id = %created.id, "Return request created");

        self.event_sender
            .send(Event::ReturnRequested {
                return_id: created.id,
                order_id,
            })
            .await;
        // Operator channel, best-effort.
        self.notifier
            .dispatch_best_effort(Notification::ReturnRequestCreated {
                return_id: created.id,
                order_id,
                order_number: order.order_number,
                reason,
            })
            .await;

        Ok(created.into())
    }

    /// Approves a pending return and moves the order to `returned`.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn approve_return(&self, return_id: Uuid) -> Result<ReturnResponse, ServiceError> {
        let request = self.find_return(return_id).await?;
        if request.status != ReturnStatus::Pending {
            return Err(ServiceError::ValidationError(format!(
                "Return request is '{}' and can no longer be approved",
                request.status
            )));
        }

        self.orders.mark_returned(request.order_id).await?;

        let updated = self
            .set_status(request, ReturnStatus::Approved)
            .await?;

        self.event_sender
            .send(Event::ReturnResolved {
                return_id,
                order_id: updated.order_id,
                approved: true,
            })
            .await;

        info!(order_id = %updated.order_id, "Return approved; order returned");
        Ok(updated.into())
    }

    /// Rejects a pending return; the order keeps its current status.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn reject_return(&self, return_id: Uuid) -> Result<ReturnResponse, ServiceError> {
        let request = self.find_return(return_id).await?;
        if request.status != ReturnStatus::Pending {
            return Err(ServiceError::ValidationError(format!(
                "Return request is '{}' and can no longer be rejected",
                request.status
            )));
        }

        let updated = self.set_status(request, ReturnStatus::Rejected).await?;

        self.event_sender
            .send(Event::ReturnResolved {
                return_id,
                order_id: updated.order_id,
                approved: false,
            })
            .await;

        Ok(updated.into())
    }

    /// Marks an approved return as completed once goods are received back.
    #[instrument(skip(self), fields(return_id = %return_id))]
    pub async fn complete_return(&self, return_id: Uuid) -> Result<ReturnResponse, ServiceError> {
        let request = self.find_return(return_id).await?;
        if request.status != ReturnStatus::Approved {
            return Err(ServiceError::ValidationError(format!(
                "Only approved returns can be completed; this one is '{}'",
                request.status
            )));
        }

        let updated = self.set_status(request, ReturnStatus::Completed).await?;
        Ok(updated.into())
    }

    /// Gets a return request by id.
    pub async fn get_return(&self, return_id: Uuid) -> Result<ReturnResponse, ServiceError> {
        Ok(self.find_return(return_id).await?.into())
    }

    /// Lists return requests, newest first.
    #[instrument(skip(self))]
    pub async fn list_returns(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ReturnResponse>, u64), ServiceError> {
        let page = page.max(1);
        let paginator = ReturnEntity::find()
            .order_by_desc(return_request::Column::CreatedAt)
            .paginate(&*self.db, per_page.clamp(1, 100));

        let total = paginator.num_items().await?;
        let returns = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok((returns, total))
    }

    async fn find_return(&self, return_id: Uuid) -> Result<ReturnModel, ServiceError> {
        ReturnEntity::find_by_id(return_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Return request {} not found", return_id))
            })
    }

    async fn set_status(
        &self,
        request: ReturnModel,
        status: ReturnStatus,
    ) -> Result<ReturnModel, ServiceError> {
        let mut active: return_request::ActiveModel = request.into();
        active.status = Set(status);
        if !status.is_open() {
            // Frees the one-open-request-per-order slot so the customer may
            // file again after a rejection.
            active.open_for_order = Set(None);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }
}
