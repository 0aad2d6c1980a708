//! # Application Error
//!
//! Maps domain errors to structured HTTP responses with proper status
//! codes and error bodies. The mapping follows the error taxonomy's retry
//! semantics: retryable kinds get statuses a client would reasonably
//! retry on, and scope-hiding `NotFound` stays a plain 404.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use rtsm_core::RtsmError;

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// A domain error from the trial service.
    #[error(transparent)]
    Domain(#[from] RtsmError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err.kind() {
                "authentication" => StatusCode::UNAUTHORIZED,
                "forbidden" => StatusCode::FORBIDDEN,
                "not_found" => StatusCode::NOT_FOUND,
                "invalid_state" | "conflict" | "concurrent_modification" | "depot_inventory"
                | "not_eligible" => StatusCode::CONFLICT,
                "validation" => StatusCode::UNPROCESSABLE_ENTITY,
                "allocation" => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Domain(err) => err.kind(),
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("rtsm_errors_total", "kind" => self.kind()).increment(1);
        let body = serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, axum::Json(body)).into_response()
    }
}
