//! API Routes Module
//!
//! This module organizes all HTTP endpoints into logical groups:
//! - `verify`: single-address verification
//! - `batch`: JSON and file-upload batch verification
//! - `health`: health checks and readiness probes

pub mod batch;
pub mod health;
pub mod verify;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build all API routes and return a configured Router
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Verification endpoints
        .route("/v1/verify", get(verify::verify_address_handler))
        .route("/v1/verify-batch", post(batch::verify_batch_handler))
        .route(
            "/v1/verify-batch/upload",
            post(batch::verify_batch_upload_handler),
        )
        // Health and monitoring endpoints
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::ready_handler))
        // Apply shared state to all routes
        .with_state(state)
}
