use axum::{extract::State, http::StatusCode};
use std::sync::Arc;

use crate::error::PaymentError;
use crate::services::PaymentService;

pub async fn purge_payments(State(service): State<Arc<PaymentService>>) -> Result<StatusCode, PaymentError> {
    service.purge().await?;
    Ok(StatusCode::OK)
}
