use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::error::{PaymentError, StorageError};
use crate::models::payment::{PaymentRequest, PaymentSummary, PersistedPayment};
use crate::models::processor::ProcessorIdentity;
use crate::storage::PaymentStore;

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub flush_retry_delay: Duration,
    pub storage_retries: u32,
    pub storage_retry_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: Duration::from_millis(10),
            flush_retry_delay: Duration::from_millis(5),
            storage_retries: 2,
            storage_retry_delay: Duration::from_millis(50),
        }
    }
}

struct PendingPayment {
    payment: PersistedPayment,
    dispatched_at: Instant,
}

struct PendingBatches {
    default: Vec<PendingPayment>,
    fallback: Vec<PendingPayment>,
    last_flush: Instant,
}

impl PendingBatches {
    fn len(&self) -> usize {
        self.default.len() + self.fallback.len()
    }

    fn sequence_mut(&mut self, processor: ProcessorIdentity) -> &mut Vec<PendingPayment> {
        match processor {
            ProcessorIdentity::Default => &mut self.default,
            ProcessorIdentity::Fallback => &mut self.fallback,
        }
    }
}

/// Groups dispatched payments into multi-row inserts.
///
/// One lock covers both per-processor sequences, so the size trigger sees
/// the combined count and a flush writes a consistent snapshot.
pub struct BatchWriter {
    store: Arc<dyn PaymentStore>,
    pending: Mutex<PendingBatches>,
    settings: BatchSettings,
}

impl BatchWriter {
    pub fn new(store: Arc<dyn PaymentStore>, settings: BatchSettings) -> Self {
        Self {
            store,
            pending: Mutex::new(PendingBatches {
                default: Vec::with_capacity(settings.batch_size),
                fallback: Vec::with_capacity(settings.batch_size),
                last_flush: Instant::now(),
            }),
            settings,
        }
    }

    /// Records a payment taken by `processor`, flushing when the combined
    /// batch is full or the last flush is older than the flush interval.
    pub async fn accumulate(&self, request: &PaymentRequest, processor: ProcessorIdentity) -> Result<(), PaymentError> {
        let mut pending = self.pending.lock().await;
        pending.sequence_mut(processor).push(PendingPayment {
            payment: PersistedPayment::from_request(request, processor),
            dispatched_at: Instant::now(),
        });

        if pending.len() >= self.settings.batch_size || pending.last_flush.elapsed() > self.settings.flush_interval {
            self.flush_locked(&mut pending).await?;
        }

        Ok(())
    }

    /// Flushes both sequences unconditionally.
    pub async fn force_flush(&self) -> Result<(), PaymentError> {
        let mut pending = self.pending.lock().await;
        self.flush_locked(&mut pending).await
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Totals per processor over `[from, to]`, after pending rows are flushed.
    pub async fn summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<PaymentSummary, PaymentError> {
        if let Err(e) = self.force_flush().await {
            warn!("Pending payments lost before summary: {}", e);
        }

        self.with_storage_retries("summary", || self.store.summarize(from, to))
            .await
    }

    /// Flushes, then deletes every persisted payment.
    pub async fn purge(&self) -> Result<(), PaymentError> {
        if let Err(e) = self.force_flush().await {
            warn!("Pending payments lost before purge: {}", e);
        }

        self.with_storage_retries("purge", || self.store.purge()).await?;
        info!("All persisted payments purged");
        Ok(())
    }

    // Sequences are cleared whether or not their insert succeeds.
    async fn flush_locked(&self, pending: &mut PendingBatches) -> Result<(), PaymentError> {
        let mut first_error = None;

        for processor in ProcessorIdentity::ALL {
            let batch = std::mem::take(pending.sequence_mut(processor));
            if batch.is_empty() {
                continue;
            }

            let oldest = batch.iter().map(|p| p.dispatched_at).min();
            let rows: Vec<PersistedPayment> = batch.into_iter().map(|p| p.payment).collect();

            match self.insert_with_retry(&rows).await {
                Ok(()) => debug!(
                    processor = %processor,
                    rows = rows.len(),
                    oldest_ms = oldest.map(|t| t.elapsed().as_millis() as u64).unwrap_or_default(),
                    "batch flushed"
                ),
                Err(e) => {
                    error!("Dropping {} {} payment(s) after failed insert: {}", rows.len(), processor, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        pending.last_flush = Instant::now();

        match first_error {
            Some(e) => Err(PaymentError::PersistenceFailed(e)),
            None => Ok(()),
        }
    }

    async fn insert_with_retry(&self, rows: &[PersistedPayment]) -> Result<(), StorageError> {
        match self.store.insert_batch(rows).await {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Batch insert failed, retrying once: {}", e);
                sleep(self.settings.flush_retry_delay).await;
                self.store.insert_batch(rows).await
            }
        }
    }

    async fn with_storage_retries<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, PaymentError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.settings.storage_retries => {
                    attempt += 1;
                    warn!("Storage {} failed (attempt {}): {}", operation, attempt, e);
                    sleep(self.settings.storage_retry_delay).await;
                }
                Err(e) => return Err(PaymentError::StorageUnavailable(e)),
            }
        }
    }
}
