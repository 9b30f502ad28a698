pub mod atomic_metrics;
pub mod batch_writer;
pub mod dispatcher;
pub mod health_cache;
pub mod payment_processor_client;
pub mod payment_service;
pub mod worker_pool;

pub use payment_processor_client::{PaymentProcessorClient, ProcessorTransport};
pub use payment_service::PaymentService;
