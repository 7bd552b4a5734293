use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use anyhow::Result;

pub use memory::*;
pub use operations::*;
pub use pool::*;

pub mod memory;
pub mod operations;
pub mod pool;

pub async fn create_pool(config: &DatabaseConfig, url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(url)
        .await?;

    // Test connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    Ok(pool)
}

/// Connect, migrate and wrap the configured store; in-memory when no URL is set.
pub async fn create_store(config: &DatabaseConfig) -> Result<Arc<dyn VectorRecordStore>> {
    let Some(url) = config.url.as_deref() else {
        warn!("DATABASE_URL not set, records will live in memory only");
        return Ok(Arc::new(InMemoryRecordStore::new()));
    };

    let pool = create_pool(config, url).await?;

    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    Ok(Arc::new(PgRecordStore::new(pool)))
}
