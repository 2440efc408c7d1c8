//! Single-address verification route
//!
//! Runs the full pipeline for one address: format screen, MX lookup and the
//! SMTP dialogue with MX fallback.

use crate::{
    api_handler::{ApiError, ApiResult, VerifyQuery, VerifyResponse},
    AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// GET /v1/verify?address=user@example.com
///
/// Classifies the deliverability of one address. Response time is dominated
/// by the SMTP dialogue and bounded by the per-probe timeout times the number
/// of MX hosts.
#[instrument(skip(state), fields(address = %query.address, request_id))]
pub async fn verify_address_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<VerifyResponse> {
    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", &request_id);

    let address = query.address.trim();
    if address.is_empty() {
        warn!("empty address provided");
        return Err(ApiError::InvalidAddress(
            "address cannot be empty".to_string(),
        ));
    }

    let verdict = state.verifier.verify(address).await;

    info!(
        category = %verdict.category,
        is_valid = verdict.is_valid,
        "verification complete"
    );

    Ok(Json(VerifyResponse {
        request_id,
        verdict,
    }))
}
