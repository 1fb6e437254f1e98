//! Relational access for the recommender
//!
//! The fusion engine only sees the store traits; the PostgreSQL
//! implementations live beside them.

pub mod destination_repo;
pub mod rating_repo;
pub mod user_repo;

pub use destination_repo::{DestinationStore, PgDestinationStore};
pub use rating_repo::{PgRatingStore, RatingStore};
pub use user_repo::{PgUserStore, UserStore};

use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create the connection pool and verify it with a round trip
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database pool created and verified"
    );

    Ok(pool)
}

/// Create the destinations, users and ratings tables if they are missing
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
