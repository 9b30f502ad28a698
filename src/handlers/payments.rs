use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use crate::error::PaymentError;
use crate::models::payment::{IncomingPayment, PaymentRequest};
use crate::services::PaymentService;
use crate::utils::money::normalize_amount;

pub async fn create_payment(
    State(service): State<Arc<PaymentService>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), PaymentError> {
    let requested_at = Utc::now();

    // Missing content type and malformed JSON both answer 400.
    let Json(payload) = payload.map_err(|rejection| {
        error!("Unreadable payment body: {}", rejection.body_text());
        PaymentError::InvalidRequest(rejection.body_text())
    })?;

    let incoming: IncomingPayment = serde_json::from_value(payload).map_err(|e| {
        error!("Invalid payment request: {}", e);
        PaymentError::InvalidRequest(e.to_string())
    })?;

    let amount = normalize_amount(incoming.amount).map_err(PaymentError::InvalidRequest)?;
    let correlation_id = incoming
        .correlation_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let request = PaymentRequest::new(correlation_id.clone(), amount, requested_at);
    let handle = service.submit_payment(request)?;

    if !service.waits_for_completion() {
        return Ok((
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "correlationId": correlation_id, "status": "accepted" })),
        ));
    }

    let processor = handle.wait().await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "correlationId": correlation_id,
            "status": "processed",
            "processor": processor,
        })),
    ))
}
