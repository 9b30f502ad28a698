use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::processor::ProcessorIdentity;

/// Errors surfaced by the admission, dispatch and persistence pipeline.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("admission queue is full")]
    QueueFull,

    #[error("admission queue is closed")]
    QueueClosed,

    #[error("{processor} processor call failed: {source}")]
    ProcessorCallFailed {
        processor: ProcessorIdentity,
        #[source]
        source: ProcessorCallError,
    },

    #[error("all payment processors are unavailable")]
    AllProcessorsUnavailable,

    #[error("payment could not be recorded: {0}")]
    PersistenceFailed(#[source] StorageError),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StorageError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("worker dropped the job before completing it")]
    WorkerLost,

    #[error("internal error: {0}")]
    Internal(String),
}

/// A single failed attempt against a processor.
#[derive(Error, Debug)]
pub enum ProcessorCallError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    InvalidBody(String),
}

impl From<reqwest::Error> for ProcessorCallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProcessorCallError::Timeout
        } else if err.is_decode() {
            ProcessorCallError::InvalidBody(err.to_string())
        } else {
            ProcessorCallError::Transport(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("connection unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("injected failure: {0}")]
    Injected(String),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::QueueFull | PaymentError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PaymentError::ProcessorCallFailed { .. } | PaymentError::AllProcessorsUnavailable => {
                StatusCode::BAD_GATEWAY
            }
            PaymentError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PaymentError::PersistenceFailed(_)
            | PaymentError::WorkerLost
            | PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
