//! Shared API types and utilities
//!
//! Common request/response types, error handling and conversions used across
//! the API endpoints.

use axum::{http::StatusCode, response::Json};
use mailvet_core::{BatchStatistics, Verdict, VerifierError, MAX_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for single-address verification
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    /// Address to verify (e.g., "user@example.com")
    pub address: String,
}

/// Request body for JSON batch verification
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub addresses: Vec<String>,
}

/// API response for single-address verification
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Request ID for tracking
    pub request_id: String,
    #[serde(flatten)]
    pub verdict: Verdict,
}

/// API response for batch verification
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Request ID for tracking
    pub request_id: String,
    /// Verdicts in input order
    pub results: Vec<Verdict>,
    /// Final aggregate over all verdicts
    pub statistics: BatchStatistics,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    pub request_id: String,
    pub timestamp: String,
}

/// Result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    InvalidAddress(String),
    InvalidBatch(String),
    BatchTooLarge(usize),
    InvalidUpload(String),
    InternalError(String),
}

impl From<VerifierError> for ApiError {
    fn from(err: VerifierError) -> Self {
        match err {
            VerifierError::BatchTooLarge(count) => ApiError::BatchTooLarge(count),
            VerifierError::EmptyBatch => {
                ApiError::InvalidBatch("batch input is empty".to_string())
            }
            VerifierError::ResolverInit(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidAddress(msg) => (StatusCode::BAD_REQUEST, "INVALID_ADDRESS", msg),
            ApiError::InvalidBatch(msg) => (StatusCode::BAD_REQUEST, "INVALID_BATCH", msg),
            ApiError::BatchTooLarge(count) => (
                StatusCode::BAD_REQUEST,
                "BATCH_TOO_LARGE",
                format!("batch of {count} addresses exceeds the limit of {MAX_BATCH_SIZE}"),
            ),
            ApiError::InvalidUpload(msg) => (StatusCode::BAD_REQUEST, "INVALID_UPLOAD", msg),
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let error_response = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailvet_core::VerdictCategory;

    #[test]
    fn test_batch_too_large_maps_from_core_error() {
        let err = ApiError::from(VerifierError::BatchTooLarge(60_000));
        assert!(matches!(err, ApiError::BatchTooLarge(60_000)));
    }

    #[test]
    fn test_verify_response_flattens_verdict() {
        let response = VerifyResponse {
            request_id: "req-1".to_string(),
            verdict: Verdict::new("a@ex.com", VerdictCategory::Valid, "accepted"),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["request_id"], "req-1");
        assert_eq!(json["address"], "a@ex.com");
        assert_eq!(json["category"], "valid");
        assert_eq!(json["is_valid"], true);
    }
}
