//! Provider payload and normalized device record types
//!
//! `RawProviderResponse` mirrors the upstream JSON loosely on purpose: the
//! provider varies key casing, ships `result` as either a text blob or an
//! object, and sends numbers as strings. Strong validation here would reject
//! real traffic, so the normalizer owns all interpretation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Lookup outcome status as the provider reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupStatus {
    Success,
    Error,
}

impl LookupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStatus::Success => "success",
            LookupStatus::Error => "error",
        }
    }
}

/// Raw provider response, retained verbatim for audit and re-derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProviderResponse {
    /// Either a newline-delimited "Label: value" blob or a loose object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default)]
    pub imei: String,
    /// String or number depending on the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// "success" or "error"; anything else is treated as an error
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RawProviderResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Canonical normalized device record
///
/// All derived fields are optional: upstream coverage varies by service and
/// absence is not an error. `extra_fields` keeps unmapped provider fields
/// under their original casing for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDeviceInfo {
    pub imei: String,
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub status: LookupStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fmi_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icloud_lock: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blacklist_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sim_lock: Option<String>,
    #[serde(default)]
    pub provider_price: Option<f64>,
    #[serde(default)]
    pub provider_balance_after: Option<f64>,
    /// The untouched provider `result` payload
    #[serde(default)]
    pub raw_result: Option<Value>,
    /// The whole provider response, when it came from a live call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<RawProviderResponse>,
    pub checked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_fields: BTreeMap<String, String>,
}
