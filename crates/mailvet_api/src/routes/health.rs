//! Health check and monitoring routes

use crate::AppState;
use axum::{extract::State, response::Json};
use serde::Serialize;
use std::sync::Arc;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: std::time::SystemTime,
}

/// Health check endpoint - GET /health
///
/// Simple health check to verify the API is running.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: std::time::SystemTime,
}

/// Readiness check endpoint - GET /ready
///
/// The verifier is wired at startup; a format screen through the pipeline's
/// front door proves the core is callable without touching the network.
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let is_ready = state.config.verifier.concurrent_limit > 0
        && mailvet_core::format::is_valid_address("probe@example.com");

    Json(ReadinessResponse {
        ready: is_ready,
        timestamp: std::time::SystemTime::now(),
    })
}
