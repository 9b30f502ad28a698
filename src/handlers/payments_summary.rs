use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::PaymentError;
use crate::models::payment::PaymentSummary;
use crate::services::PaymentService;

#[derive(Deserialize)]
pub struct SummaryQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_bound(name: &str, value: Option<String>) -> Result<DateTime<Utc>, PaymentError> {
    let raw = value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::InvalidRequest(format!("missing '{name}' parameter")))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PaymentError::InvalidRequest(format!("invalid '{name}': {e}")))
}

pub async fn get_summary(
    State(service): State<Arc<PaymentService>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<PaymentSummary>, PaymentError> {
    let from = parse_bound("from", query.from)?;
    let to = parse_bound("to", query.to)?;
    info!("Getting payments summary from {} to {}", from, to);

    let summary = service.get_summary(from, to).await?;
    Ok(Json(summary))
}
