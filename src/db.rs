use sea_orm::{
    sea_query::TableCreateStatement, ConnectOptions, ConnectionTrait, Database,
    DatabaseConnection, Schema,
};
use std::time::Duration;
use tracing::info;

use crate::entities;
use crate::errors::ServiceError;

/// Type alias for a database connection pool.
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool to the database.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let mut opts = ConnectOptions::new(database_url.to_string());
    // In-memory SQLite exists per connection; a wider pool would hand each
    // connection its own empty database.
    let max_connections = if database_url.starts_with("sqlite::memory:") {
        1
    } else {
        10
    };
    opts.max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    let db = Database::connect(opts).await?;
    info!("Database connection established");
    Ok(db)
}

/// Creates any missing tables from the entity definitions.
///
/// Used on startup when `auto_migrate` is set and by the test harness; real
/// deployments run migrations out of band.
pub async fn create_schema(db: &DbPool) -> Result<(), ServiceError> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(entities::product::Entity),
        schema.create_table_from_entity(entities::order::Entity),
        schema.create_table_from_entity(entities::order_item::Entity),
        schema.create_table_from_entity(entities::return_request::Entity),
        schema.create_table_from_entity(entities::shipment::Entity),
        schema.create_table_from_entity(entities::tracking_event::Entity),
    ];

    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    info!("Database schema bootstrapped");
    Ok(())
}
