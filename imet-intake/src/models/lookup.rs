//! Request/response shapes for the lookup pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LookupErrorCode;
use crate::models::NormalizedDeviceInfo;

/// Single lookup request body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    /// IMEI or serial, depending on `serial_mode`
    #[serde(default)]
    pub imei: Option<String>,
    /// Explicit provider service id; wins over `service_key`
    #[serde(default)]
    pub service_id: Option<String>,
    /// Named catalog entry (e.g. "appleBasicInfo")
    #[serde(default)]
    pub service_key: Option<String>,
    /// Operator-assigned grade overlay
    #[serde(default)]
    pub grade: Option<String>,
    /// Operator-assigned cost overlay
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub serial_mode: bool,
}

/// Batch lookup request body: shared parameters plus the identifier list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLookupRequest {
    #[serde(default)]
    pub imeis: Vec<String>,
    /// Inter-item pacing in milliseconds, clamped to [0, 2000]
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_key: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub serial_mode: bool,
}

impl BatchLookupRequest {
    /// Shared per-item request, minus the identifier
    pub fn item_request(&self, identifier: &str) -> LookupRequest {
        LookupRequest {
            imei: Some(identifier.to_string()),
            service_id: self.service_id.clone(),
            service_key: self.service_key.clone(),
            grade: self.grade.clone(),
            cost: self.cost,
            serial_mode: self.serial_mode,
        }
    }
}

/// Tenant/actor identity attached to every lookup
///
/// Session handling lives in an external gateway; by the time a request
/// reaches this core the identity is already resolved.
#[derive(Debug, Clone)]
pub struct LookupContext {
    pub tenant_id: String,
    pub actor_id: String,
}

/// Where a successful lookup came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupSource {
    Cache,
    Live,
}

impl LookupSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupSource::Cache => "cache",
            LookupSource::Live => "live",
        }
    }
}

/// Successful lookup response
#[derive(Debug, Clone, Serialize)]
pub struct LookupOutcome {
    pub source: LookupSource,
    pub data: NormalizedDeviceInfo,
}

/// Per-identifier outcome in a batch response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Success {
        imei: String,
        ok: bool,
        source: LookupSource,
        data: NormalizedDeviceInfo,
    },
    Failure {
        imei: String,
        ok: bool,
        error: String,
        code: LookupErrorCode,
    },
}

impl BatchItemResult {
    pub fn success(imei: String, source: LookupSource, data: NormalizedDeviceInfo) -> Self {
        BatchItemResult::Success {
            imei,
            ok: true,
            source,
            data,
        }
    }

    pub fn failure(imei: String, error: String, code: LookupErrorCode) -> Self {
        BatchItemResult::Failure {
            imei,
            ok: false,
            error,
            code,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, BatchItemResult::Success { .. })
    }

    pub fn identifier(&self) -> &str {
        match self {
            BatchItemResult::Success { imei, .. } => imei,
            BatchItemResult::Failure { imei, .. } => imei,
        }
    }
}

/// History row surfaced by GET /api/recent-lookups
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentLookup {
    pub id: String,
    pub imei: String,
    pub service_id: String,
    pub service_name: Option<String>,
    pub status: String,
    pub price: Option<f64>,
    pub balance: Option<f64>,
    pub model_name: Option<String>,
    pub carrier: Option<String>,
    pub blacklist_status: Option<String>,
    pub created_at: DateTime<Utc>,
}
