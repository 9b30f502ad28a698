use std::sync::Arc;
use tracing::info;

use crate::app::config::Config;
use crate::error::PaymentError;
use crate::queue::AdmissionQueue;
use crate::services::atomic_metrics::AtomicMetrics;
use crate::services::batch_writer::{BatchSettings, BatchWriter};
use crate::services::dispatcher::{DispatchEngine, RetryPolicy};
use crate::services::health_cache::HealthCache;
use crate::services::payment_processor_client::ProcessorTransport;
use crate::services::worker_pool::WorkerPool;
use crate::services::PaymentService;
use crate::storage::{PaymentStore, StatusStore};

/// The running admission → dispatch → persistence pipeline.
///
/// Every shared service (queue, health cache, batch writer) is built once
/// here and handed out by `Arc`; nothing lives in globals.
pub struct Pipeline {
    pub service: Arc<PaymentService>,
    pub health: Arc<HealthCache>,
    queue: Arc<AdmissionQueue>,
    batches: Arc<BatchWriter>,
    workers: WorkerPool,
}

impl Pipeline {
    pub async fn start(
        config: &Config,
        payments: Arc<dyn PaymentStore>,
        statuses: Arc<dyn StatusStore>,
        transport: Arc<dyn ProcessorTransport>,
    ) -> Self {
        let health = Arc::new(HealthCache::new(
            config.default_processor_url.clone(),
            config.fallback_processor_url.clone(),
            config.health_staleness(),
            statuses,
        ));
        health.warm_start().await;

        let batches = Arc::new(BatchWriter::new(
            payments,
            BatchSettings {
                batch_size: config.batch_size,
                flush_interval: config.flush_interval(),
                flush_retry_delay: config.flush_retry_delay(),
                storage_retries: config.storage_retries,
                storage_retry_delay: config.storage_retry_delay(),
            },
        ));

        let engine = Arc::new(DispatchEngine::new(
            transport,
            health.clone(),
            batches.clone(),
            RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.base_delay(),
            },
        ));

        let queue = Arc::new(AdmissionQueue::new(config.queue_capacity));
        let metrics = Arc::new(AtomicMetrics::new());
        let workers = WorkerPool::spawn(config.worker_count, queue.clone(), engine, metrics.clone());

        let service = Arc::new(PaymentService::new(
            queue.clone(),
            batches.clone(),
            health.clone(),
            metrics,
            config.wait_for_completion,
        ));

        Self {
            service,
            health,
            queue,
            batches,
            workers,
        }
    }

    /// Closes admission, lets workers drain the queue, then flushes what is pending.
    pub async fn shutdown(self) -> Result<(), PaymentError> {
        self.queue.close();
        if !self.queue.is_empty() {
            info!("Draining {} queued payment(s)", self.queue.len());
        }
        self.workers.join().await;
        self.batches.force_flush().await?;
        info!("Pipeline stopped");
        Ok(())
    }
}
