use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::processor::ProcessorIdentity;

/// Body accepted on `POST /payments`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingPayment {
    #[serde(default)]
    pub correlation_id: Option<String>,
    pub amount: Decimal,
}

/// An admitted payment. Serialized as-is to the processors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub correlation_id: String,
    pub amount: Decimal,
    pub requested_at: DateTime<Utc>,
}

impl PaymentRequest {
    pub fn new(correlation_id: impl Into<String>, amount: Decimal, requested_at: DateTime<Utc>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            amount,
            requested_at,
        }
    }
}

/// Append-only row of the `payments` table.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedPayment {
    pub correlation_id: String,
    pub amount: Decimal,
    pub processor: ProcessorIdentity,
    pub requested_at: DateTime<Utc>,
}

impl PersistedPayment {
    pub fn from_request(request: &PaymentRequest, processor: ProcessorIdentity) -> Self {
        Self {
            correlation_id: request.correlation_id.clone(),
            amount: request.amount,
            processor,
            requested_at: request.requested_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_requests: u64,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PaymentSummary {
    pub default: Summary,
    pub fallback: Summary,
}

impl PaymentSummary {
    pub fn get_mut(&mut self, processor: ProcessorIdentity) -> &mut Summary {
        match processor {
            ProcessorIdentity::Default => &mut self.default,
            ProcessorIdentity::Fallback => &mut self.fallback,
        }
    }
}
