use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use crate::error::PaymentError;
use crate::models::payment::PaymentRequest;
use crate::models::processor::ProcessorIdentity;
use crate::services::batch_writer::BatchWriter;
use crate::services::health_cache::HealthCache;
use crate::services::payment_processor_client::ProcessorTransport;
use crate::utils::money::format_currency;

pub const MAX_RETRIES: u32 = 2;
pub const BASE_DELAY: Duration = Duration::from_millis(10);

/// Bounded retries with exponential backoff, applied per tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            base_delay: BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `base * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Total calls per tier: the initial attempt plus retries.
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

enum TierOutcome {
    Delivered,
    Skipped,
    Exhausted,
}

/// Delivers one payment to exactly one processor, preferring `default`.
pub struct DispatchEngine {
    transport: Arc<dyn ProcessorTransport>,
    health: Arc<HealthCache>,
    batches: Arc<BatchWriter>,
    policy: RetryPolicy,
}

impl DispatchEngine {
    pub fn new(
        transport: Arc<dyn ProcessorTransport>,
        health: Arc<HealthCache>,
        batches: Arc<BatchWriter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            health,
            batches,
            policy,
        }
    }

    /// Tries each tier in preference order. A delivered payment is handed to
    /// the batch writer; if recording it fails the job fails with
    /// `PersistenceFailed` even though the processor accepted it.
    pub async fn dispatch(&self, request: &PaymentRequest) -> Result<ProcessorIdentity, PaymentError> {
        for processor in ProcessorIdentity::ALL {
            match self.try_tier(processor, request).await {
                TierOutcome::Delivered => {
                    self.batches.accumulate(request, processor).await?;
                    return Ok(processor);
                }
                TierOutcome::Skipped | TierOutcome::Exhausted => continue,
            }
        }

        error!(
            "Payment {} ({}) failed on every processor",
            request.correlation_id,
            format_currency(request.amount)
        );
        Err(PaymentError::AllProcessorsUnavailable)
    }

    async fn try_tier(&self, processor: ProcessorIdentity, request: &PaymentRequest) -> TierOutcome {
        if self.health.is_stale(processor) {
            self.spawn_probe(processor);
        }

        let mut called = false;
        for attempt in 0..self.policy.attempts() {
            let status = self.health.status(processor);
            if status.failing {
                debug!("Skipping {} processor: marked failing", processor);
                break;
            }

            called = true;
            let started = Instant::now();
            match self.transport.submit(processor, &status.base_url, request).await {
                Ok(()) => {
                    self.health.record_success(processor, started.elapsed()).await;
                    debug!("Payment {} accepted by {} processor", request.correlation_id, processor);
                    return TierOutcome::Delivered;
                }
                Err(source) => {
                    let failure = PaymentError::ProcessorCallFailed { processor, source };
                    debug!("Attempt {} for {}: {}", attempt + 1, request.correlation_id, failure);
                    if attempt < self.policy.max_retries {
                        sleep(self.policy.delay(attempt)).await;
                    }
                }
            }
        }

        if called {
            self.health.record_exhausted(processor).await;
            TierOutcome::Exhausted
        } else {
            TierOutcome::Skipped
        }
    }

    // The current attempt never waits on the probe; its result only refreshes the cache.
    fn spawn_probe(&self, processor: ProcessorIdentity) {
        if !self.health.begin_probe(processor) {
            return;
        }

        let transport = self.transport.clone();
        let health = self.health.clone();
        tokio::spawn(async move {
            let base_url = health.status(processor).base_url;
            match transport.service_health(processor, &base_url).await {
                Ok(report) => {
                    info!(
                        "{} processor health: failing={} minResponseTime={}ms",
                        processor, report.failing, report.min_response_time
                    );
                    health.record_probe(processor, report).await;
                }
                Err(e) => warn!("{} processor health probe failed: {}", processor, e),
            }
            health.end_probe(processor);
        });
    }
}
