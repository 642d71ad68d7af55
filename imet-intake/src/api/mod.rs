//! HTTP API handlers for imet-intake

pub mod health;
pub mod history;
pub mod lookup;
pub mod provider;

pub use health::health_routes;
pub use history::history_routes;
pub use lookup::lookup_routes;
pub use provider::provider_routes;

use axum::http::HeaderMap;

use crate::error::{LookupError, LookupErrorCode, LookupResult};
use crate::models::LookupContext;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Resolve the tenant/actor identity from request headers.
///
/// Authentication happens upstream; these headers are set by the gateway.
/// A request without a tenant id cannot be scoped and is rejected.
pub fn lookup_context(headers: &HeaderMap) -> LookupResult<LookupContext> {
    let tenant_id = headers
        .get(TENANT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            LookupError::new(
                LookupErrorCode::Unknown,
                "Missing X-Tenant-Id header.",
            )
        })?
        .to_string();

    let actor_id = headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string();

    Ok(LookupContext {
        tenant_id,
        actor_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_requires_tenant_header() {
        let mut headers = HeaderMap::new();
        assert!(lookup_context(&headers).is_err());

        headers.insert(TENANT_HEADER, "acme".parse().unwrap());
        let context = lookup_context(&headers).unwrap();
        assert_eq!(context.tenant_id, "acme");
        assert_eq!(context.actor_id, "unknown");

        headers.insert(ACTOR_HEADER, "jordan".parse().unwrap());
        let context = lookup_context(&headers).unwrap();
        assert_eq!(context.actor_id, "jordan");
    }
}
