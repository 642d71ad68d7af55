//! Provider account endpoints
//!
//! Thin pass-throughs to the upstream account API, resolved with the same
//! per-tenant key the lookup pipeline uses.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::lookup_context;
use crate::error::{LookupError, LookupErrorCode, LookupResult};
use crate::services::provider::{validate_service_id, DeviceProvider, ServiceValidation};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: Option<f64>,
}

/// GET /api/provider/balance
pub async fn balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LookupResult<Json<BalanceResponse>> {
    let context = lookup_context(&headers)?;
    let api_key = state.orchestrator.api_key_for_tenant(&context.tenant_id).await?;

    let balance = state.orchestrator.provider().fetch_balance(&api_key).await?;
    Ok(Json(BalanceResponse { balance }))
}

/// GET /api/provider/services
///
/// Returns the upstream service list document verbatim.
pub async fn services(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> LookupResult<Json<Value>> {
    let context = lookup_context(&headers)?;
    let api_key = state.orchestrator.api_key_for_tenant(&context.tenant_id).await?;

    let services = state.orchestrator.provider().fetch_services(&api_key).await?;
    Ok(Json(services))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateServiceQuery {
    pub service_id: Option<String>,
}

/// GET /api/provider/validate-service?serviceId=N
pub async fn validate_service(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ValidateServiceQuery>,
) -> LookupResult<Json<ServiceValidation>> {
    let context = lookup_context(&headers)?;

    let service_id = query
        .service_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            LookupError::new(
                LookupErrorCode::S01ServiceInvalid,
                "Missing serviceId query parameter.",
            )
        })?;

    let api_key = state.orchestrator.api_key_for_tenant(&context.tenant_id).await?;
    let validation =
        validate_service_id(state.orchestrator.provider(), &api_key, service_id).await;

    Ok(Json(validation))
}

/// Build provider account routes
pub fn provider_routes() -> Router<AppState> {
    Router::new()
        .route("/api/provider/balance", get(balance))
        .route("/api/provider/services", get(services))
        .route("/api/provider/validate-service", get(validate_service))
}
