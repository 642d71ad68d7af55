//! Provider response normalization
//!
//! Takes the loosely-structured provider payload (a "Label: value" text blob
//! or an object with arbitrary key casing) and produces a stable
//! `NormalizedDeviceInfo`. Field extraction goes through ordered label alias
//! lists because upstream services disagree on spellings; composite fields
//! (model description, locked carrier) get a second-pass pattern extraction
//! used only as a fallback when no direct label matched.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::catalog::service_meta_by_id;
use crate::error::LookupError;
use crate::models::{LookupStatus, NormalizedDeviceInfo, RawProviderResponse};
use crate::services::classifier::classify_provider_message;

// Label alias tables. Ordered: first present non-empty value wins. These
// encode real-world provider inconsistency and are part of the contract.
pub(crate) const STORAGE_LABELS: &[&str] = &["Storage", "Capacity", "Storage Capacity"];
pub(crate) const MANUFACTURER_LABELS: &[&str] =
    &["Manufacturer", "Brand", "Device Manufacturer"];
pub(crate) const MODEL_NAME_LABELS: &[&str] = &["Model Name", "Model", "Device"];
pub(crate) const MODEL_CODE_LABELS: &[&str] = &["Model Code", "Model Number", "Part Number"];
pub(crate) const DESCRIPTION_LABELS: &[&str] = &["Description", "Device info"];
pub(crate) const FMI_STATUS_LABELS: &[&str] = &[
    "FMI Status",
    "Find My iPhone",
    "FMI",
    "iCloud FMI",
    "iCloud Status",
];
pub(crate) const ICLOUD_LOCK_LABELS: &[&str] = &["iCloud Lock", "iCloud Status", "iCloud"];
pub(crate) const BLACKLIST_LABELS: &[&str] =
    &["Blacklist Status", "Blacklisted", "GSMA Status", "Blacklist"];
pub(crate) const CARRIER_LABELS: &[&str] = &["Carrier", "Carrier Lock", "Network"];
pub(crate) const PURCHASE_COUNTRY_LABELS: &[&str] =
    &["Purchase Country", "Country", "Purchase Country Code"];
pub(crate) const SIM_LOCK_LABELS: &[&str] = &[
    "SIM-Lock",
    "Sim-Lock Status",
    "Lock Status",
    "Sim Lock Status",
    "SIM Lock",
];
pub(crate) const MODEL_DESCRIPTION_LABELS: &[&str] = &["Model Description"];
pub(crate) const LOCKED_CARRIER_LABELS: &[&str] = &["Locked Carrier"];

static MODEL_DESC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)\s+(\d+GB)").unwrap());
static CARRIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:US\s+)?(AT&T|T-Mobile|Verizon|Sprint|Cricket)").unwrap());
static ACTIVATION_POLICY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+Activation Policy.*").unwrap());

/// Lowercase with internal whitespace collapsed; makes label lookups
/// case/spacing-insensitive
pub(crate) fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Flatten the provider `result` into a label -> value string map.
///
/// Every extracted key is inserted under its original spelling and, when it
/// differs, under its normalized form as well. Text blobs split on the first
/// `:` per line, with `=>` accepted as an alternate separator.
pub(crate) fn flatten_result(result: Option<&Value>) -> BTreeMap<String, String> {
    let mut record = BTreeMap::new();

    let Some(result) = result else {
        return record;
    };

    match result {
        Value::String(text) => {
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let sanitized = line.replace("=>", ":");
                let Some(separator) = sanitized.find(':') else {
                    continue;
                };
                let key = sanitized[..separator].trim();
                let value = sanitized[separator + 1..].trim();
                if key.is_empty() {
                    continue;
                }

                record.insert(key.to_string(), value.to_string());
                record.insert(normalize_key(key), value.to_string());
            }
        }
        Value::Object(map) => {
            for (key, value) in map {
                let stringified = stringify_value(value);
                let normalized = normalize_key(key);
                record.insert(key.clone(), stringified.clone());
                if normalized != *key {
                    record.insert(normalized, stringified);
                }
            }
        }
        _ => {}
    }

    record
}

/// Resolve a field by trying each label verbatim, then normalized. Empty
/// values are treated as absent.
pub(crate) fn pick_field(record: &BTreeMap<String, String>, labels: &[&str]) -> Option<String> {
    for label in labels {
        if let Some(value) = record.get(*label) {
            if !value.is_empty() {
                return Some(value.clone());
            }
        }
        if let Some(value) = record.get(&normalize_key(label)) {
            if !value.is_empty() {
                return Some(value.clone());
            }
        }
    }
    None
}

/// Split "IPHONE 16 PRO MAX NATURAL 256GB-USA" into name + storage; text
/// without a `<digits>GB` token becomes the model name alone
pub(crate) fn parse_model_description(desc: &str) -> (Option<String>, Option<String>) {
    if desc.is_empty() {
        return (None, None);
    }
    if let Some(caps) = MODEL_DESC_RE.captures(desc) {
        let name = caps.get(1).map(|m| m.as_str().trim().to_string());
        let storage = caps.get(2).map(|m| m.as_str().trim().to_string());
        return (name, storage);
    }
    (Some(desc.to_string()), None)
}

/// Extract a carrier name from strings like "23 - US AT&T Activation Policy".
/// Known carrier tokens win; otherwise take the text after the first dash and
/// strip any trailing "Activation Policy..." suffix; otherwise pass through.
pub(crate) fn parse_carrier(carrier: &str) -> Option<String> {
    if carrier.is_empty() {
        return None;
    }
    if let Some(caps) = CARRIER_RE.captures(carrier) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    if let Some((_, after)) = carrier.split_once('-') {
        let stripped = ACTIVATION_POLICY_RE.replace(after.trim(), "");
        return Some(stripped.trim().to_string());
    }
    Some(carrier.to_string())
}

/// Coerce a provider price/balance value to a finite float. Strings get
/// thousands-separator commas stripped. Anything unparsable is None.
pub(crate) fn parse_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let normalized = s.replace(',', "");
            if normalized.trim().is_empty() {
                return None;
            }
            normalized.trim().parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

/// Classify a non-success payload into a typed error.
///
/// Message priority: `error`, then `message`, then a string `result`, then a
/// fixed fallback.
pub fn extract_error(raw: &RawProviderResponse) -> Option<LookupError> {
    if raw.is_success() {
        return None;
    }

    let raw_message = raw
        .error
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| raw.message.as_deref().filter(|s| !s.is_empty()))
        .or_else(|| match &raw.result {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        })
        .unwrap_or("The provider returned an error.");

    Some(classify_provider_message(raw_message))
}

/// Normalize a successful provider payload into the canonical record shape.
pub fn normalize_payload(
    raw: &RawProviderResponse,
    fallback_service_id: &str,
) -> NormalizedDeviceInfo {
    let record = flatten_result(raw.result.as_ref());
    let service_id = raw
        .service
        .clone()
        .unwrap_or_else(|| fallback_service_id.to_string());
    let service_name = service_meta_by_id(&service_id).map(|m| m.name.to_string());

    let model_desc = pick_field(&record, MODEL_DESCRIPTION_LABELS);
    let (parsed_model_name, parsed_storage) = model_desc
        .as_deref()
        .map(parse_model_description)
        .unwrap_or((None, None));

    let parsed_carrier = pick_field(&record, LOCKED_CARRIER_LABELS)
        .as_deref()
        .and_then(parse_carrier);

    let status = if raw.is_success() {
        LookupStatus::Success
    } else {
        LookupStatus::Error
    };

    // Only original-casing variants go into extra_fields; the normalized
    // duplicates would be noise.
    let extra_fields: BTreeMap<String, String> = record
        .iter()
        .filter(|(key, _)| **key != normalize_key(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let raw_result = match &raw.result {
        Some(value) => Some(value.clone()),
        None => serde_json::to_value(&record).ok(),
    };

    NormalizedDeviceInfo {
        imei: raw.imei.clone(),
        service_id,
        service_name,
        status,
        user_grade: None,
        user_cost: None,
        manufacturer: pick_field(&record, MANUFACTURER_LABELS),
        model_name: pick_field(&record, MODEL_NAME_LABELS).or(parsed_model_name),
        model_code: pick_field(&record, MODEL_CODE_LABELS),
        storage: pick_field(&record, STORAGE_LABELS).or(parsed_storage),
        description: pick_field(&record, DESCRIPTION_LABELS).or_else(|| model_desc.clone()),
        fmi_status: pick_field(&record, FMI_STATUS_LABELS),
        icloud_lock: pick_field(&record, ICLOUD_LOCK_LABELS),
        blacklist_status: pick_field(&record, BLACKLIST_LABELS),
        carrier: pick_field(&record, CARRIER_LABELS).or(parsed_carrier),
        purchase_country: pick_field(&record, PURCHASE_COUNTRY_LABELS),
        sim_lock: pick_field(&record, SIM_LOCK_LABELS),
        provider_price: parse_number(raw.price.as_ref()),
        provider_balance_after: parse_number(raw.balance.as_ref()),
        raw_result,
        raw_response: Some(raw.clone()),
        checked_at: Utc::now(),
        extra_fields,
    }
}
