//! Durable persistence of alert records in PostgreSQL.

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Postgres SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Errors that can occur while persisting an alert
#[derive(Debug, Error)]
pub enum StoreError {
    /// An alert with the same caller uuid is already stored.
    #[error("Alert with this UUID already exists")]
    Duplicate,

    /// The store itself failed; nothing was written.
    #[error("Alert store unavailable: {0}")]
    Unavailable(String),
}

/// Candidate alert assembled by the ingestion handler
#[derive(Debug, Clone)]
pub struct NewAlert {
    /// Caller-supplied unique identifier
    pub uuid: Uuid,
    /// Video reference on the video server
    pub video: String,
    /// Store label
    pub store: String,
    /// Event timestamp, seconds since epoch
    pub timestamp: f64,
    /// Computed resolution string ("WxH")
    pub resolution: String,
}

/// Stored alert record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AlertRecord {
    /// Surrogate identifier assigned by the store
    pub id: i64,
    /// Caller-supplied unique identifier
    pub uuid: Uuid,
    /// Video reference on the video server
    pub video: String,
    /// Store label
    pub store: String,
    /// Event timestamp, seconds since epoch
    pub timestamp: f64,
    /// Computed resolution string ("WxH")
    pub resolution: String,
    /// When the record was received by the service
    pub received_at: DateTime<Utc>,
}

/// Persists alert records, enforcing uuid uniqueness
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Atomically insert a candidate alert.
    ///
    /// The insert itself is the uniqueness check: two concurrent calls with
    /// the same uuid yield exactly one stored record and one
    /// [`StoreError::Duplicate`].
    async fn insert(&self, alert: &NewAlert) -> Result<AlertRecord, StoreError>;

    /// Probe the store for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Alert store backed by a PostgreSQL connection pool
pub struct PgAlertStore {
    pool: PgPool,
}

impl PgAlertStore {
    /// Create a new alert store with connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
            .connect(&config.url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run migrations")?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AlertStore for PgAlertStore {
    #[instrument(skip(self, alert), fields(uuid = %alert.uuid, store = %alert.store))]
    async fn insert(&self, alert: &NewAlert) -> Result<AlertRecord, StoreError> {
        let record = sqlx::query_as::<_, AlertRecord>(
            r#"
            INSERT INTO alerts (uuid, video, store, timestamp, resolution, received_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING id, uuid, video, store, timestamp, resolution, received_at
            "#,
        )
        .bind(alert.uuid)
        .bind(&alert.video)
        .bind(&alert.store)
        .bind(alert.timestamp)
        .bind(&alert.resolution)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        debug!(id = record.id, "Alert stored");

        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Duplicate;
        }
    }
    StoreError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_error_maps_to_unavailable() {
        let err = map_insert_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn test_duplicate_error_message() {
        assert_eq!(
            StoreError::Duplicate.to_string(),
            "Alert with this UUID already exists"
        );
    }
}
