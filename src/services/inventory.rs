use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Inventory ledger backed by the `products.available` column.
///
/// Both mutations are expressed as a single atomic statement at the storage
/// layer. Callers never read-then-write stock levels, so concurrent
/// checkouts cannot lose updates or drive stock negative.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl InventoryService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Reserves `quantity` units of a product, failing with
    /// `InsufficientInventory` when the current stock cannot cover it.
    /// Returns the stock level after the reservation.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn reserve(&self, product_id: Uuid, quantity: i32) -> Result<i32, ServiceError> {
        let remaining = Self::reserve_on(&*self.db, product_id, quantity).await?;

        self.event_sender
            .send(Event::InventoryReserved {
                product_id,
                quantity,
                remaining,
            })
            .await;

        Ok(remaining)
    }

    /// Restores `quantity` units, used only by the cancellation path.
    /// Restoring more than was ever reserved is a caller bug, not guarded
    /// here.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn restore(&self, product_id: Uuid, quantity: i32) -> Result<(), ServiceError> {
        Self::restore_on(&*self.db, product_id, quantity).await?;

        self.event_sender
            .send(Event::InventoryRestored {
                product_id,
                quantity,
            })
            .await;

        Ok(())
    }

    /// Transaction-scoped variant of [`reserve`](Self::reserve), used by
    /// checkout so the reservation commits atomically with the order rows.
    pub async fn reserve_on<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<i32, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Reservation quantity must be at least 1".to_string(),
            ));
        }

        // UPDATE products SET available = available - ?
        // WHERE id = ? AND available >= ?
        let result = ProductEntity::update_many()
            .col_expr(
                product::Column::Available,
                Expr::col(product::Column::Available).sub(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Available.gte(quantity))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            let current = ProductEntity::find_by_id(product_id).one(conn).await?;
            return match current {
                None => Err(ServiceError::NotFound(format!(
                    "Product {} not found",
                    product_id
                ))),
                Some(p) => Err(ServiceError::InsufficientInventory(format!(
                    "Requested {} units of '{}' but only {} available",
                    quantity, p.name, p.available
                ))),
            };
        }

        let updated = ProductEntity::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "Product {} vanished after reservation",
                    product_id
                ))
            })?;

        info!(remaining = updated.available, "Inventory reserved");
        Ok(updated.available)
    }

    /// Transaction-scoped variant of [`restore`](Self::restore).
    pub async fn restore_on<C: ConnectionTrait>(
        conn: &C,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<(), ServiceError> {
        let result = ProductEntity::update_many()
            .col_expr(
                product::Column::Available,
                Expr::col(product::Column::Available).add(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(product::Column::Id.eq(product_id))
            .exec(conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product {} not found",
                product_id
            )));
        }

        info!("Inventory restored");
        Ok(())
    }

    /// Current stock level, for listings and tests.
    pub async fn available(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let product = ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
        Ok(product.available)
    }
}
