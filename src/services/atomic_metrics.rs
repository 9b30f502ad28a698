use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::processor::ProcessorIdentity;

pub struct AtomicMetrics {
    submitted: AtomicU64,
    rejected: AtomicU64,
    processed: [AtomicU64; 2],
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub submitted: u64,
    pub rejected: u64,
    pub processed_default: u64,
    pub processed_fallback: u64,
    pub failed: u64,
}

impl Default for AtomicMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicMetrics {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            processed: [AtomicU64::new(0), AtomicU64::new(0)],
            failed: AtomicU64::new(0),
        }
    }

    pub fn increment_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_processed(&self, processor: ProcessorIdentity) {
        self.processed[processor.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            processed_default: self.processed[0].load(Ordering::Relaxed),
            processed_fallback: self.processed[1].load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
