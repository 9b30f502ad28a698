use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::models::processor::{ProcessorIdentity, ProcessorStatus, ServiceHealth, StatusSnapshot};
use crate::storage::StatusStore;

/// Per-processor health and latency, shared by all workers.
///
/// Reads take a short `parking_lot` read lock. Every update runs the whole
/// read-modify-write-persist sequence under `write_gate`, so concurrent
/// workers never lose an update and snapshots reach the store in order.
pub struct HealthCache {
    statuses: RwLock<[ProcessorStatus; 2]>,
    write_gate: Mutex<()>,
    probing: [AtomicBool; 2],
    staleness: Duration,
    store: Arc<dyn StatusStore>,
}

impl HealthCache {
    pub fn new(
        default_url: impl Into<String>,
        fallback_url: impl Into<String>,
        staleness: Duration,
        store: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            statuses: RwLock::new([ProcessorStatus::new(default_url), ProcessorStatus::new(fallback_url)]),
            write_gate: Mutex::new(()),
            probing: [AtomicBool::new(false), AtomicBool::new(false)],
            staleness,
            store,
        }
    }

    /// Refreshes in-memory statuses from the persisted snapshot. A store
    /// failure keeps the defaults.
    pub async fn warm_start(&self) {
        match self.store.load_statuses().await {
            Ok(snapshots) => {
                let mut statuses = self.statuses.write();
                for snapshot in &snapshots {
                    let status = &mut statuses[snapshot.processor.index()];
                    status.failing = snapshot.failing;
                    status.min_response_time_ms = snapshot.min_response_time_ms;
                    status.last_update = snapshot.last_update;
                }
                info!("Loaded {} processor status snapshot(s)", snapshots.len());
            }
            Err(e) => warn!("Could not load processor status snapshot: {}", e),
        }
    }

    pub fn status(&self, processor: ProcessorIdentity) -> ProcessorStatus {
        self.statuses.read()[processor.index()].clone()
    }

    pub fn all(&self) -> [ProcessorStatus; 2] {
        self.statuses.read().clone()
    }

    pub fn is_stale(&self, processor: ProcessorIdentity) -> bool {
        let last_update = self.statuses.read()[processor.index()].last_update;
        match (Utc::now() - last_update).to_std() {
            Ok(age) => age > self.staleness,
            Err(_) => false,
        }
    }

    /// Successful payment: the processor is healthy and answered in `latency`.
    pub async fn record_success(&self, processor: ProcessorIdentity, latency: Duration) {
        let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.update(processor, Some(false), Some(latency_ms)).await;
    }

    /// Every attempt against the tier failed. The observation time moves
    /// forward but `failing` keeps its current value.
    pub async fn record_exhausted(&self, processor: ProcessorIdentity) {
        self.update(processor, None, None).await;
    }

    pub async fn record_probe(&self, processor: ProcessorIdentity, health: ServiceHealth) {
        self.update(processor, Some(health.failing), Some(health.min_response_time))
            .await;
    }

    async fn update(&self, processor: ProcessorIdentity, failing: Option<bool>, response_time_ms: Option<u64>) {
        let _gate = self.write_gate.lock().await;

        let snapshot = {
            let mut statuses = self.statuses.write();
            let status = &mut statuses[processor.index()];
            if let Some(failing) = failing {
                status.failing = failing;
            }
            if let Some(ms) = response_time_ms.filter(|ms| *ms > 0) {
                status.min_response_time_ms = ms;
            }
            status.last_update = Utc::now();

            StatusSnapshot {
                processor,
                failing: status.failing,
                min_response_time_ms: status.min_response_time_ms,
                last_update: status.last_update,
            }
        };

        debug!(
            processor = %processor,
            failing = snapshot.failing,
            min_response_time_ms = snapshot.min_response_time_ms,
            "processor status updated"
        );

        if let Err(e) = self.store.save_status(&snapshot).await {
            warn!("Failed to persist status of {} processor: {}", processor, e);
        }
    }

    /// Claims the probe slot for `processor`. Returns false if a probe is
    /// already running.
    pub fn begin_probe(&self, processor: ProcessorIdentity) -> bool {
        self.probing[processor.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn end_probe(&self, processor: ProcessorIdentity) {
        self.probing[processor.index()].store(false, Ordering::Release);
    }
}
