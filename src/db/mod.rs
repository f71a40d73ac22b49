//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - Short link mappings
//! - Click statistics
//! - Geo lookups of clicks

mod geo;
mod links;
mod statistics;

pub use geo::{GeoRecord, GeoRepository};
pub use links::{LinkRecord, LinkRepository, LinkStatus, RedirectKind};
pub use statistics::{StatisticsRecord, StatisticsRepository};

use crate::config::DatabaseConfig;
use chrono::{DateTime, NaiveDateTime};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("link not found: {0}")]
    LinkNotFound(String),
    #[error("link already exists: {0}")]
    LinkExists(String),
    #[error("statistics not found: {0}")]
    StatisticsNotFound(i64),
    #[error("geo not found: {0}")]
    GeoNotFound(i64),
    #[error("invalid timestamp stored in {0}")]
    InvalidTimestamp(&'static str),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create a new database connection, running migrations if needed.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DbError> {
        let path = config.path.as_str();
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache memory database per call so
            // parallel tests never share state.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:venus-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                // The data lives only as long as a connection does.
                .idle_timeout(None)
                .max_lifetime(None)
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets redirect reads proceed while report batches are written.
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let integrity_result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;

        if integrity_result != "ok" {
            tracing::error!(
                integrity_check = %integrity_result,
                "Database integrity check FAILED - corruption detected!"
            );
            return Err(DbError::Sqlx(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Database integrity check failed: {}", integrity_result),
            ))));
        }

        info!("Database integrity check passed");

        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get link repository.
    pub fn links(&self) -> LinkRepository<'_> {
        LinkRepository::new(&self.pool)
    }

    /// Get statistics repository.
    pub fn statistics(&self) -> StatisticsRepository<'_> {
        StatisticsRepository::new(&self.pool)
    }

    /// Get geo repository.
    pub fn geo(&self) -> GeoRepository<'_> {
        GeoRepository::new(&self.pool)
    }

    /// Close the pool, waiting for checked-out connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

/// Unix seconds (UTC) to a naive UTC datetime.
pub(crate) fn from_timestamp(secs: i64, column: &'static str) -> Result<NaiveDateTime, DbError> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or(DbError::InvalidTimestamp(column))
}

/// Naive UTC datetime to unix seconds.
pub(crate) fn to_timestamp(dt: &NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

#[cfg(test)]
pub(crate) async fn memory() -> Database {
    Database::new(&DatabaseConfig {
        path: ":memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap()
}
