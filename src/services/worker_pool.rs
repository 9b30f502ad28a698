use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::error::PaymentError;
use crate::queue::AdmissionQueue;
use crate::services::atomic_metrics::AtomicMetrics;
use crate::services::dispatcher::DispatchEngine;

/// Fixed set of workers draining the admission queue.
///
/// Each worker finishes a job (dispatch plus batch bookkeeping) before it
/// dequeues the next one, so the worker count bounds in-flight work.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        workers: usize,
        queue: Arc<AdmissionQueue>,
        engine: Arc<DispatchEngine>,
        metrics: Arc<AtomicMetrics>,
    ) -> Self {
        let handles = (0..workers)
            .map(|_| {
                let queue = queue.clone();
                let engine = engine.clone();
                let metrics = metrics.clone();
                tokio::spawn(async move { run_worker(&queue, &engine, &metrics).await })
            })
            .collect();

        info!("Worker pool started with {} workers", workers);
        Self { handles }
    }

    /// Waits for every worker to exit. Workers exit once the queue is closed
    /// and drained.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Worker task ended abnormally: {}", e);
            }
        }
    }
}

async fn run_worker(queue: &AdmissionQueue, engine: &DispatchEngine, metrics: &AtomicMetrics) {
    while let Some(job) = queue.dequeue().await {
        let outcome = AssertUnwindSafe(engine.dispatch(&job.request))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(PaymentError::Internal("dispatch panicked".to_string())));

        match &outcome {
            Ok(processor) => metrics.increment_processed(*processor),
            Err(e) => {
                metrics.increment_failed();
                error!("Payment {} failed: {}", job.request.correlation_id, e);
            }
        }

        job.complete(outcome);
    }
}
