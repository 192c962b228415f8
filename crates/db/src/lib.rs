//! Persistence layer for the accessibility scan engine.
//!
//! SQLite via sqlx: an embedded store keeps the scanner deployable as a
//! single process with no external database. Repositories are zero-sized
//! structs with async methods taking the pool as the first argument.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod models;
pub mod repositories;

/// Shared connection pool type.
pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool for the given database URL.
///
/// The database file is created on first use; foreign keys are enforced
/// so result rows cascade when their session is deleted.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
}

/// Apply all pending migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Cheap liveness probe used by the health endpoint.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
