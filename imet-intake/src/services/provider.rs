//! Device-lookup provider client
//!
//! The upstream is a GET-style API keyed by query parameters. Everything
//! network-shaped sits behind the `DeviceProvider` trait so the orchestrator
//! and tests never touch reqwest directly; the client itself is constructed
//! once at the composition root and shared via `AppState`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{LookupError, LookupErrorCode, LookupResult};
use crate::models::RawProviderResponse;
use crate::services::normalizer::parse_number;

/// Response format requested for device lookups
pub const LOOKUP_FORMAT: &str = "beta";

const REQUEST_TIMEOUT_SECS: u64 = 30;
const BODY_EXCERPT_LEN: usize = 200;

/// Upstream lookup API seam
#[async_trait]
pub trait DeviceProvider: Send + Sync {
    /// Run one paid device lookup
    async fn lookup(
        &self,
        identifier: &str,
        service_id: &str,
        api_key: &str,
    ) -> LookupResult<RawProviderResponse>;

    /// Fetch the remaining account balance
    async fn fetch_balance(&self, api_key: &str) -> LookupResult<Option<f64>>;

    /// Fetch the raw service list document
    async fn fetch_services(&self, api_key: &str) -> LookupResult<Value>;
}

/// HTTP implementation of the provider contract
pub struct HttpDeviceProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpDeviceProvider {
    pub fn new(base_url: impl Into<String>) -> LookupResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LookupError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    async fn perform_request(&self, params: &[(&str, &str)]) -> LookupResult<Value> {
        tracing::debug!(url = %self.base_url, "Querying provider");

        let response = self
            .http
            .get(&self.base_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| LookupError::internal(format!("Provider request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let excerpt: String = body.chars().take(BODY_EXCERPT_LEN).collect();
            return Err(LookupError::new(
                LookupErrorCode::Unknown,
                format!("Provider request failed ({}): {}", status.as_u16(), excerpt),
            )
            .with_status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| LookupError::internal(format!("Provider response was not JSON: {}", e)))
    }
}

#[async_trait]
impl DeviceProvider for HttpDeviceProvider {
    async fn lookup(
        &self,
        identifier: &str,
        service_id: &str,
        api_key: &str,
    ) -> LookupResult<RawProviderResponse> {
        let value = self
            .perform_request(&[
                ("key", api_key),
                ("format", LOOKUP_FORMAT),
                ("imei", identifier),
                ("service", service_id),
            ])
            .await?;

        serde_json::from_value(value)
            .map_err(|e| LookupError::internal(format!("Provider response decode failed: {}", e)))
    }

    async fn fetch_balance(&self, api_key: &str) -> LookupResult<Option<f64>> {
        let value = self
            .perform_request(&[("key", api_key), ("action", "balance")])
            .await?;
        Ok(parse_number(value.get("balance")))
    }

    async fn fetch_services(&self, api_key: &str) -> LookupResult<Value> {
        self.perform_request(&[("key", api_key), ("action", "services"), ("format", "json")])
            .await
    }
}

/// Outcome of checking whether a service id exists upstream
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceValidation {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Check the upstream service list for a service id.
///
/// Best-effort: any fetch or parse problem reports the service as absent
/// rather than failing the caller.
pub async fn validate_service_id(
    provider: &dyn DeviceProvider,
    api_key: &str,
    service_id: &str,
) -> ServiceValidation {
    let services = match provider.fetch_services(api_key).await {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "Service list fetch failed during validation");
            return ServiceValidation::default();
        }
    };

    let Some(list) = services.get("Service List").and_then(Value::as_array) else {
        return ServiceValidation::default();
    };

    for entry in list {
        if field_as_string(entry, "service").as_deref() == Some(service_id) {
            return ServiceValidation {
                exists: true,
                name: field_as_string(entry, "name"),
                price: field_as_string(entry, "price"),
            };
        }
    }

    ServiceValidation::default()
}

// The service list ships ids sometimes as strings, sometimes as numbers.
fn field_as_string(entry: &Value, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
