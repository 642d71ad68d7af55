//! Lookup endpoints
//!
//! POST /api/check        - single identifier
//! POST /api/check/batch  - up to 50 identifiers, processed sequentially

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::api::lookup_context;
use crate::error::LookupResult;
use crate::models::{
    BatchItemResult, BatchLookupRequest, LookupRequest, LookupSource, NormalizedDeviceInfo,
};
use crate::services::run_batch;
use crate::AppState;

/// Single-lookup response envelope
#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub ok: bool,
    pub source: LookupSource,
    pub data: NormalizedDeviceInfo,
}

/// Batch response envelope; `results` is ordered like the deduplicated input
#[derive(Debug, Serialize)]
pub struct BatchCheckResponse {
    pub count: usize,
    pub results: Vec<BatchItemResult>,
}

/// POST /api/check
pub async fn check(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LookupRequest>,
) -> LookupResult<Json<CheckResponse>> {
    let context = lookup_context(&headers)?;
    let outcome = state.orchestrator.process(&request, &context).await?;

    Ok(Json(CheckResponse {
        ok: true,
        source: outcome.source,
        data: outcome.data,
    }))
}

/// POST /api/check/batch
pub async fn check_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BatchLookupRequest>,
) -> LookupResult<Json<BatchCheckResponse>> {
    let context = lookup_context(&headers)?;
    let results = run_batch(&state.orchestrator, &request, &context).await?;

    Ok(Json(BatchCheckResponse {
        count: results.len(),
        results,
    }))
}

/// Build lookup routes
pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/check", post(check))
        .route("/api/check/batch", post(check_batch))
}
