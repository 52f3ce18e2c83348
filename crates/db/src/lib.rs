//! PostgreSQL persistence for the machine fleet.
//!
//! Pool setup and migrations live here, together with the `machines` row
//! model, request DTOs, the [`MachineRepo`](repositories::MachineRepo) query
//! layer, and [`PgMachineStore`], which plugs the repository into the
//! [`MachineStore`](fleet_core::store::MachineStore) contract.

pub mod models;
pub mod pg_store;
pub mod repositories;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use pg_store::PgMachineStore;

pub type DbPool = sqlx::PgPool;

/// How long to wait for a pooled connection before reporting the store as
/// unavailable.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Apply all pending migrations embedded from `migrations/`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
