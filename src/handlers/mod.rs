pub mod metrics;
pub mod payments;
pub mod payments_summary;
pub mod purge;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::services::PaymentService;

pub fn router(service: Arc<PaymentService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthcheck", get(healthcheck_handler))
        .route("/payments", post(payments::create_payment))
        .route("/payments-summary", get(payments_summary::get_summary))
        .route("/purge-payments", post(purge::purge_payments))
        .route("/metrics", get(metrics::get_metrics))
        .with_state(service)
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}

async fn healthcheck_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
