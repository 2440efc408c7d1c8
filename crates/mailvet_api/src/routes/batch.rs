//! Batch verification routes
//!
//! Two entry points feed the same scheduler: a JSON address list and a
//! multipart upload of a line-oriented TXT/CSV file. Both reject oversized
//! batches before any scheduling happens, and both log a progress line every
//! hundred verdicts through the scheduler's statistics hook.

use crate::{
    api_handler::{ApiError, ApiResult, BatchRequest, BatchResponse},
    upload, AppState,
};
use axum::{
    extract::{Multipart, State},
    response::Json,
};
use mailvet_core::{BatchHooks, BatchScheduler};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// POST /v1/verify-batch
///
/// Body: `{"addresses": ["a@example.com", ...]}` with at most 50,000 entries.
#[instrument(skip(state, request), fields(request_id))]
pub async fn verify_batch_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<BatchResponse> {
    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", &request_id);

    run_batch(&state, request.addresses, request_id).await
}

/// POST /v1/verify-batch/upload
///
/// Multipart upload of a line-oriented address list; see
/// [`upload::parse_address_list`] for the accepted shape.
#[instrument(skip_all, fields(request_id))]
pub async fn verify_batch_upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<BatchResponse> {
    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", &request_id);

    let field = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::InvalidUpload(format!("malformed multipart body: {err}")))?
        .ok_or_else(|| ApiError::InvalidUpload("no file field in upload".to_string()))?;

    let body = field
        .text()
        .await
        .map_err(|err| ApiError::InvalidUpload(format!("upload is not UTF-8 text: {err}")))?;

    let addresses = upload::parse_address_list(&body);
    if addresses.is_empty() {
        return Err(ApiError::InvalidUpload(
            "no usable addresses in upload".to_string(),
        ));
    }

    run_batch(&state, addresses, request_id).await
}

async fn run_batch(
    state: &AppState,
    addresses: Vec<String>,
    request_id: String,
) -> ApiResult<BatchResponse> {
    if addresses.is_empty() {
        return Err(ApiError::InvalidBatch("no addresses provided".to_string()));
    }

    info!(count = addresses.len(), "starting batch verification");

    let scheduler = BatchScheduler::new(Arc::clone(&state.verifier));
    let progress_id = request_id.clone();
    let hooks = BatchHooks {
        on_progress: None,
        on_stats: Some(Box::new(move |stats| {
            info!(
                request_id = %progress_id,
                completed = stats.total,
                valid = stats.valid,
                invalid = stats.invalid,
                "batch progress"
            );
        })),
    };

    let report = scheduler
        .run(addresses, hooks)
        .await
        .map_err(ApiError::from)?;

    info!(
        total = report.statistics.total,
        valid = report.statistics.valid,
        invalid = report.statistics.invalid,
        "batch verification complete"
    );

    Ok(Json(BatchResponse {
        request_id,
        results: report.results,
        statistics: report.statistics,
    }))
}
