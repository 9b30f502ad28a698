pub mod in_memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StorageError;
use crate::models::payment::{PaymentSummary, PersistedPayment};
use crate::models::processor::StatusSnapshot;

pub use in_memory::InMemoryStore;
pub use postgres::PgStore;

/// Append-only payment records and the aggregation read over them.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Writes all rows in one grouped insert.
    async fn insert_batch(&self, payments: &[PersistedPayment]) -> Result<(), StorageError>;

    /// Totals per processor for rows with `requested_at` in `[from, to]`.
    async fn summarize(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<PaymentSummary, StorageError>;

    async fn purge(&self) -> Result<(), StorageError>;
}

/// Persisted snapshot of the processor health cache.
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn load_statuses(&self) -> Result<Vec<StatusSnapshot>, StorageError>;

    async fn save_status(&self, snapshot: &StatusSnapshot) -> Result<(), StorageError>;
}
