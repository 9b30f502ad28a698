use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::services::payment_service::ServiceMetrics;
use crate::services::PaymentService;

pub async fn get_metrics(State(payment_service): State<Arc<PaymentService>>) -> Json<ServiceMetrics> {
    Json(payment_service.get_metrics())
}
