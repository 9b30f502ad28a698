use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::StorageError;
use crate::models::payment::{PaymentSummary, PersistedPayment};
use crate::models::processor::{ProcessorIdentity, StatusSnapshot};
use crate::storage::{PaymentStore, StatusStore};

/// A thread-safe in-memory store for payments and status snapshots.
///
/// Clones share the same state. Used for local runs without postgres and as
/// a test double; `fail_next_inserts` injects write failures.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    payments: Arc<RwLock<Vec<PersistedPayment>>>,
    statuses: Arc<RwLock<HashMap<ProcessorIdentity, StatusSnapshot>>>,
    insert_calls: Arc<AtomicUsize>,
    failing_inserts: Arc<AtomicUsize>,
    failing_purges: Arc<AtomicUsize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls to `insert_batch` fail.
    pub fn fail_next_inserts(&self, count: usize) {
        self.failing_inserts.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` calls to `purge` fail.
    pub fn fail_next_purges(&self, count: usize) {
        self.failing_purges.store(count, Ordering::SeqCst);
    }

    pub fn payments(&self) -> Vec<PersistedPayment> {
        self.payments.read().clone()
    }

    /// Number of `insert_batch` calls, failed ones included.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn status(&self, processor: ProcessorIdentity) -> Option<StatusSnapshot> {
        self.statuses.read().get(&processor).cloned()
    }

    pub fn seed_status(&self, snapshot: StatusSnapshot) {
        self.statuses.write().insert(snapshot.processor, snapshot);
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert_batch(&self, payments: &[PersistedPayment]) -> Result<(), StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);

        if take_one(&self.failing_inserts) {
            return Err(StorageError::Injected("insert rejected".to_string()));
        }

        self.payments.write().extend_from_slice(payments);
        Ok(())
    }

    async fn summarize(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<PaymentSummary, StorageError> {
        let payments = self.payments.read();
        let mut summary = PaymentSummary::default();

        for payment in payments
            .iter()
            .filter(|p| p.requested_at >= from && p.requested_at <= to)
        {
            let totals = summary.get_mut(payment.processor);
            totals.total_requests += 1;
            totals.total_amount += payment.amount;
        }

        Ok(summary)
    }

    async fn purge(&self) -> Result<(), StorageError> {
        if take_one(&self.failing_purges) {
            return Err(StorageError::Injected("purge rejected".to_string()));
        }
        self.payments.write().clear();
        Ok(())
    }
}

#[async_trait]
impl StatusStore for InMemoryStore {
    async fn load_statuses(&self) -> Result<Vec<StatusSnapshot>, StorageError> {
        Ok(self.statuses.read().values().cloned().collect())
    }

    async fn save_status(&self, snapshot: &StatusSnapshot) -> Result<(), StorageError> {
        self.statuses.write().insert(snapshot.processor, snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn payment(id: &str, processor: ProcessorIdentity, at: DateTime<Utc>) -> PersistedPayment {
        PersistedPayment {
            correlation_id: id.to_string(),
            amount: dec!(10.00),
            processor,
            requested_at: at,
        }
    }

    #[tokio::test]
    async fn summarize_filters_by_inclusive_range() {
        let store = InMemoryStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap();
        store
            .insert_batch(&[
                payment("a", ProcessorIdentity::Default, t0),
                payment("b", ProcessorIdentity::Default, t0 + Duration::seconds(10)),
                payment("c", ProcessorIdentity::Fallback, t0 + Duration::seconds(20)),
            ])
            .await
            .unwrap();

        let summary = store.summarize(t0, t0 + Duration::seconds(10)).await.unwrap();
        assert_eq!(summary.default.total_requests, 2);
        assert_eq!(summary.default.total_amount, dec!(20.00));
        assert_eq!(summary.fallback.total_requests, 0);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let store = InMemoryStore::new();
        store.fail_next_inserts(1);
        let rows = [payment("a", ProcessorIdentity::Default, Utc::now())];

        assert!(store.insert_batch(&rows).await.is_err());
        assert!(store.insert_batch(&rows).await.is_ok());
        assert_eq!(store.payments().len(), 1);
        assert_eq!(store.insert_calls(), 2);
    }

    #[tokio::test]
    async fn status_upsert_replaces_previous_row() {
        let store = InMemoryStore::new();
        let mut snapshot = StatusSnapshot {
            processor: ProcessorIdentity::Fallback,
            failing: false,
            min_response_time_ms: 5,
            last_update: Utc::now(),
        };
        store.save_status(&snapshot).await.unwrap();
        snapshot.failing = true;
        store.save_status(&snapshot).await.unwrap();

        let loaded = store.load_statuses().await.unwrap();
        assert_eq!(loaded, vec![snapshot]);
    }
}
