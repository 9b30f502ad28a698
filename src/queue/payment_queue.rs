use crossbeam::queue::ArrayQueue;
use tokio::sync::{oneshot, Semaphore};

use crate::error::PaymentError;
use crate::models::payment::PaymentRequest;
use crate::models::processor::ProcessorIdentity;

/// Terminal result of one job: the processor that took the payment, or why none did.
pub type JobOutcome = Result<ProcessorIdentity, PaymentError>;

/// An admitted payment plus its single-use completion signal.
#[derive(Debug)]
pub struct PaymentJob {
    pub request: PaymentRequest,
    completion: oneshot::Sender<JobOutcome>,
}

impl PaymentJob {
    pub fn new(request: PaymentRequest) -> (Self, JobHandle) {
        let (completion, receiver) = oneshot::channel();
        (Self { request, completion }, JobHandle { receiver })
    }

    /// Consumes the job, delivering its outcome. A caller that stopped
    /// waiting is not an error.
    pub fn complete(self, outcome: JobOutcome) {
        let _ = self.completion.send(outcome);
    }
}

/// Caller side of a job's completion signal.
#[derive(Debug)]
pub struct JobHandle {
    receiver: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    /// Waits for the worker to finish the job. A job dropped without being
    /// completed resolves to `WorkerLost`.
    pub async fn wait(self) -> JobOutcome {
        self.receiver.await.unwrap_or(Err(PaymentError::WorkerLost))
    }
}

/// Fixed-capacity FIFO between the ingestion boundary and the worker pool.
///
/// `enqueue` never blocks: a full queue is reported as `QueueFull`. Workers
/// suspend in `dequeue` until a job is available. The semaphore holds one
/// permit per queued job.
pub struct AdmissionQueue {
    jobs: ArrayQueue<PaymentJob>,
    available: Semaphore,
}

impl AdmissionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: ArrayQueue::new(capacity),
            available: Semaphore::new(0),
        }
    }

    pub fn enqueue(&self, request: PaymentRequest) -> Result<JobHandle, PaymentError> {
        if self.available.is_closed() {
            return Err(PaymentError::QueueClosed);
        }

        let (job, handle) = PaymentJob::new(request);
        self.jobs.push(job).map_err(|_| PaymentError::QueueFull)?;
        self.available.add_permits(1);
        Ok(handle)
    }

    /// Next job in admission order. After `close`, drains what is left and
    /// then returns `None`.
    pub async fn dequeue(&self) -> Option<PaymentJob> {
        loop {
            match self.available.acquire().await {
                Ok(permit) => {
                    permit.forget();
                    if let Some(job) = self.jobs.pop() {
                        return Some(job);
                    }
                }
                Err(_) => return self.jobs.pop(),
            }
        }
    }

    /// Stops admission and wakes idle workers so they can drain and exit.
    pub fn close(&self) {
        self.available.close();
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.jobs.capacity()
    }
}
