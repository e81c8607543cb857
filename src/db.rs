//! Database connection pool setup.
//!
//! The pool lives behind a handle that can be fully disposed before a
//! restore's destructive phase and re-created afterwards: any connection
//! held across `DROP SCHEMA public CASCADE` can block the reset or
//! resurrect stale session state once the restore completes.

use crate::error::{AppError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Create a new database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Handle to the application pool supporting dispose/reconnect cycles.
#[derive(Clone)]
pub struct Db {
    database_url: String,
    pool: Arc<RwLock<Option<PgPool>>>,
}

impl Db {
    /// Connect and wrap the pool in a disposable handle.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self {
            database_url: database_url.to_string(),
            pool: Arc::new(RwLock::new(Some(pool))),
        })
    }

    /// Clone out the current pool. Fails while the pool is disposed
    /// (i.e. a restore's destructive phase is in progress).
    pub async fn pool(&self) -> Result<PgPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Internal("database pool is disposed".into()))
    }

    /// Close every connection and drop the pool.
    pub async fn dispose(&self) {
        let mut guard = self.pool.write().await;
        if let Some(pool) = guard.take() {
            pool.close().await;
        }
    }

    /// Re-establish the pool after a restore. No-op failure tolerance is
    /// left to the caller; a service without a pool is degraded but alive.
    pub async fn reconnect(&self) -> Result<()> {
        let pool = create_pool(&self.database_url).await?;
        *self.pool.write().await = Some(pool);
        Ok(())
    }
}
