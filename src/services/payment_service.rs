use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PaymentError;
use crate::models::payment::{PaymentRequest, PaymentSummary};
use crate::models::processor::ProcessorStatus;
use crate::queue::{AdmissionQueue, JobHandle};
use crate::services::atomic_metrics::{AtomicMetrics, MetricsSnapshot};
use crate::services::batch_writer::BatchWriter;
use crate::services::health_cache::HealthCache;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceMetrics {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub processors: ProcessorStatuses,
}

#[derive(Debug, Serialize)]
pub struct ProcessorStatuses {
    pub default: ProcessorStatus,
    pub fallback: ProcessorStatus,
}

/// Entry point used by the HTTP handlers.
pub struct PaymentService {
    queue: Arc<AdmissionQueue>,
    batches: Arc<BatchWriter>,
    health: Arc<HealthCache>,
    metrics: Arc<AtomicMetrics>,
    wait_for_completion: bool,
}

impl PaymentService {
    pub fn new(
        queue: Arc<AdmissionQueue>,
        batches: Arc<BatchWriter>,
        health: Arc<HealthCache>,
        metrics: Arc<AtomicMetrics>,
        wait_for_completion: bool,
    ) -> Self {
        Self {
            queue,
            batches,
            health,
            metrics,
            wait_for_completion,
        }
    }

    /// Non-blocking admission. Rejects with `QueueFull` when the queue is at capacity.
    pub fn submit_payment(&self, request: PaymentRequest) -> Result<JobHandle, PaymentError> {
        let correlation_id = request.correlation_id.clone();
        match self.queue.enqueue(request) {
            Ok(handle) => {
                self.metrics.increment_submitted();
                debug!("Payment {} admitted", correlation_id);
                Ok(handle)
            }
            Err(e) => {
                self.metrics.increment_rejected();
                warn!("Payment {} rejected: {}", correlation_id, e);
                Err(e)
            }
        }
    }

    pub fn waits_for_completion(&self) -> bool {
        self.wait_for_completion
    }

    pub async fn get_summary(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<PaymentSummary, PaymentError> {
        self.batches.summary(from, to).await
    }

    pub async fn purge(&self) -> Result<(), PaymentError> {
        self.batches.purge().await
    }

    pub fn get_metrics(&self) -> ServiceMetrics {
        let [default, fallback] = self.health.all();
        ServiceMetrics {
            counters: self.metrics.snapshot(),
            queue_depth: self.queue.len(),
            queue_capacity: self.queue.capacity(),
            processors: ProcessorStatuses { default, fallback },
        }
    }
}
