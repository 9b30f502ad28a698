pub mod payment_queue;

pub use payment_queue::{AdmissionQueue, JobHandle, JobOutcome, PaymentJob};
