use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use super::{bounded, StoreError};
use crate::config::DatabaseConfig;

/// Open the Postgres pool and make sure the server answers before we start serving.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let dsn = config
        .dsn
        .as_deref()
        .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;

    let connect_timeout = Duration::from_secs(config.connection_timeout);
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .idle_timeout(Duration::from_secs(config.max_idle_time_secs))
        .acquire_timeout(connect_timeout)
        .connect_lazy(dsn)?;

    health_check(&pool, connect_timeout).await?;

    info!(max_connections = config.max_connections, "database connection pool established");
    Ok(pool)
}

/// Pings the pool to ensure connectivity
pub async fn health_check(pool: &PgPool, limit: Duration) -> Result<(), StoreError> {
    bounded(limit, async {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok::<_, StoreError>(())
    })
    .await
}
