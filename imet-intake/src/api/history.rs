//! Lookup history endpoint

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::api::lookup_context;
use crate::db::lookups::recent_lookups;
use crate::error::LookupResult;
use crate::models::RecentLookup;
use crate::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// GET /api/recent-lookups?limit=N
pub async fn recent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> LookupResult<Json<Vec<RecentLookup>>> {
    let context = lookup_context(&headers)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let rows = recent_lookups(&state.db, &context.tenant_id, limit).await?;
    Ok(Json(rows))
}

/// Build history routes
pub fn history_routes() -> Router<AppState> {
    Router::new().route("/api/recent-lookups", get(recent))
}
