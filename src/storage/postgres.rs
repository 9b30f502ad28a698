use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::{info, warn};

use crate::app::config::Config;
use crate::error::StorageError;
use crate::models::payment::{PaymentSummary, PersistedPayment, Summary};
use crate::models::processor::{ProcessorIdentity, StatusSnapshot};
use crate::storage::{PaymentStore, StatusStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        correlation_id TEXT NOT NULL,
        amount NUMERIC(12, 2) NOT NULL,
        handler TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS payments_created_at_idx ON payments (created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS cache (
        processor TEXT PRIMARY KEY,
        failing BOOLEAN NOT NULL,
        min_response_time BIGINT NOT NULL,
        last_update TIMESTAMPTZ NOT NULL
    )
    "#,
];

/// Postgres-backed store for payments and processor status snapshots.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Builds the pool and verifies it with a ping.
    pub async fn connect(config: &Config) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .min_connections(config.db_min_connections)
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_millis(config.db_acquire_timeout_ms))
            .connect(&config.database_url)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let store = Self::new(pool);
        store.ping().await?;
        info!(
            "Connected to postgres (pool {}..{})",
            config.db_min_connections, config.db_max_connections
        );
        Ok(store)
    }

    pub async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(())
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_batch(&self, payments: &[PersistedPayment]) -> Result<(), StorageError> {
        if payments.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO payments (correlation_id, amount, handler, created_at) ");
        builder.push_values(payments, |mut row, payment| {
            row.push_bind(payment.correlation_id.clone())
                .push_bind(payment.amount)
                .push_bind(payment.processor.as_str())
                .push_bind(payment.requested_at);
        });
        builder.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn summarize(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<PaymentSummary, StorageError> {
        let rows = sqlx::query_as::<_, (String, i64, Option<Decimal>)>(
            r#"
            SELECT handler, COUNT(*) AS total_requests, SUM(amount) AS total_amount
            FROM payments
            WHERE created_at >= $1 AND created_at <= $2
            GROUP BY handler
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = PaymentSummary::default();
        for (handler, total_requests, total_amount) in rows {
            let processor = match handler.parse::<ProcessorIdentity>() {
                Ok(processor) => processor,
                Err(e) => {
                    warn!("Skipping summary row: {}", e);
                    continue;
                }
            };
            *summary.get_mut(processor) = Summary {
                total_requests: u64::try_from(total_requests).unwrap_or_default(),
                total_amount: total_amount.unwrap_or_default(),
            };
        }

        Ok(summary)
    }

    async fn purge(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM payments").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl StatusStore for PgStore {
    async fn load_statuses(&self) -> Result<Vec<StatusSnapshot>, StorageError> {
        let rows = sqlx::query_as::<_, (String, bool, i64, DateTime<Utc>)>(
            "SELECT processor, failing, min_response_time, last_update FROM cache",
        )
        .fetch_all(&self.pool)
        .await?;

        let snapshots = rows
            .into_iter()
            .filter_map(|(processor, failing, min_response_time, last_update)| {
                let processor = processor.parse::<ProcessorIdentity>().ok()?;
                Some(StatusSnapshot {
                    processor,
                    failing,
                    min_response_time_ms: u64::try_from(min_response_time).unwrap_or_default(),
                    last_update,
                })
            })
            .collect();

        Ok(snapshots)
    }

    async fn save_status(&self, snapshot: &StatusSnapshot) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO cache (processor, failing, min_response_time, last_update)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (processor)
            DO UPDATE SET
                failing = EXCLUDED.failing,
                min_response_time = EXCLUDED.min_response_time,
                last_update = EXCLUDED.last_update
            "#,
        )
        .bind(snapshot.processor.as_str())
        .bind(snapshot.failing)
        .bind(i64::try_from(snapshot.min_response_time_ms).unwrap_or(i64::MAX))
        .bind(snapshot.last_update)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
