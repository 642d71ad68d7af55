//! Cached-record rehydration
//!
//! Cache rows written before newer extraction fields existed keep their raw
//! provider payload; this pass re-runs field extraction against it and
//! backfills whatever is currently empty. An existing value is never
//! overwritten.
//!
//! The "already hydrated" short-circuit (manufacturer, model name, carrier,
//! or purchase country present) is a cheap heuristic carried over from the
//! historical cache format: a row with any of those set is assumed complete
//! even though a newer field could still be missing. Changing the field list
//! would change which historical rows get re-derived, so it stays as is.

use serde_json::Value;

use crate::catalog::service_meta_by_id;
use crate::models::NormalizedDeviceInfo;
use crate::services::normalizer::{
    flatten_result, parse_carrier, parse_model_description, pick_field, BLACKLIST_LABELS,
    CARRIER_LABELS, DESCRIPTION_LABELS, FMI_STATUS_LABELS, ICLOUD_LOCK_LABELS,
    LOCKED_CARRIER_LABELS, MANUFACTURER_LABELS, MODEL_CODE_LABELS, MODEL_DESCRIPTION_LABELS,
    MODEL_NAME_LABELS, PURCHASE_COUNTRY_LABELS, SIM_LOCK_LABELS, STORAGE_LABELS,
};

fn is_present(field: &Option<String>) -> bool {
    field.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
}

/// Re-derive normalized fields from the retained raw payload.
///
/// Pure function of (cached record, fallback service id); existing non-empty
/// values always win over freshly extracted ones.
pub fn rehydrate(
    existing: NormalizedDeviceInfo,
    fallback_service_id: &str,
) -> NormalizedDeviceInfo {
    if is_present(&existing.manufacturer)
        || is_present(&existing.model_name)
        || is_present(&existing.carrier)
        || is_present(&existing.purchase_country)
    {
        return existing;
    }

    let raw_result: Option<&Value> = existing
        .raw_response
        .as_ref()
        .and_then(|r| r.result.as_ref())
        .or(existing.raw_result.as_ref());

    let Some(raw_result) = raw_result.cloned() else {
        return existing;
    };

    let record = flatten_result(Some(&raw_result));

    let model_desc = pick_field(&record, MODEL_DESCRIPTION_LABELS);
    let (parsed_model_name, parsed_storage) = model_desc
        .as_deref()
        .map(parse_model_description)
        .unwrap_or((None, None));
    let parsed_carrier = pick_field(&record, LOCKED_CARRIER_LABELS)
        .as_deref()
        .and_then(parse_carrier);

    let mut merged = existing;

    if merged.service_id.is_empty() {
        merged.service_id = fallback_service_id.to_string();
    }
    if merged.service_name.is_none() {
        merged.service_name = service_meta_by_id(&merged.service_id).map(|m| m.name.to_string());
    }

    merged.manufacturer = merged
        .manufacturer
        .or_else(|| pick_field(&record, MANUFACTURER_LABELS));
    merged.model_name = merged
        .model_name
        .or_else(|| pick_field(&record, MODEL_NAME_LABELS))
        .or(parsed_model_name);
    merged.model_code = merged
        .model_code
        .or_else(|| pick_field(&record, MODEL_CODE_LABELS));
    merged.storage = merged
        .storage
        .or_else(|| pick_field(&record, STORAGE_LABELS))
        .or(parsed_storage);
    merged.description = merged
        .description
        .or_else(|| pick_field(&record, DESCRIPTION_LABELS))
        .or(model_desc);
    merged.fmi_status = merged
        .fmi_status
        .or_else(|| pick_field(&record, FMI_STATUS_LABELS));
    merged.icloud_lock = merged
        .icloud_lock
        .or_else(|| pick_field(&record, ICLOUD_LOCK_LABELS));
    merged.blacklist_status = merged
        .blacklist_status
        .or_else(|| pick_field(&record, BLACKLIST_LABELS));
    merged.carrier = merged
        .carrier
        .or_else(|| pick_field(&record, CARRIER_LABELS))
        .or(parsed_carrier);
    merged.purchase_country = merged
        .purchase_country
        .or_else(|| pick_field(&record, PURCHASE_COUNTRY_LABELS));
    merged.sim_lock = merged
        .sim_lock
        .or_else(|| pick_field(&record, SIM_LOCK_LABELS));
    merged.raw_result = Some(raw_result);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawProviderResponse;
    use crate::services::normalizer::normalize_payload;
    use serde_json::json;

    fn success_response(result: Value) -> RawProviderResponse {
        RawProviderResponse {
            result: Some(result),
            imei: "490154203237518".to_string(),
            balance: None,
            price: None,
            service: Some("30".to_string()),
            id: None,
            status: "success".to_string(),
            message: None,
            error: None,
        }
    }

    #[test]
    fn rehydrating_a_fresh_record_is_a_noop() {
        let raw = success_response(json!(
            "Model Name: iPhone 14\nCarrier: T-Mobile\nPurchase Country: USA"
        ));
        let normalized = normalize_payload(&raw, "30");
        let rehydrated = rehydrate(normalized.clone(), "30");
        assert_eq!(rehydrated, normalized);
    }

    #[test]
    fn backfills_fields_from_raw_payload() {
        // Simulate a record persisted before model/carrier extraction existed
        let raw = success_response(json!(
            "Model Description: IPHONE 16 PRO MAX NATURAL 256GB-USA\nLocked Carrier: 23 - US AT&T Activation Policy"
        ));
        let mut stale = normalize_payload(&raw, "30");
        stale.model_name = None;
        stale.storage = None;
        stale.carrier = None;
        stale.description = None;

        let hydrated = rehydrate(stale, "30");
        assert_eq!(hydrated.model_name.as_deref(), Some("IPHONE 16 PRO MAX NATURAL"));
        assert_eq!(hydrated.storage.as_deref(), Some("256GB"));
        assert_eq!(hydrated.carrier.as_deref(), Some("AT&T"));
    }

    #[test]
    fn short_circuits_when_key_fields_present() {
        let raw = success_response(json!("Model Name: iPhone 14\nStorage: 256GB"));
        let mut cached = normalize_payload(&raw, "30");
        // Carrier present: assumed hydrated, storage stays missing
        cached.storage = None;
        cached.model_name = None;
        cached.carrier = Some("Verizon".to_string());

        let out = rehydrate(cached.clone(), "30");
        assert_eq!(out, cached);
        assert!(out.storage.is_none());
    }

    #[test]
    fn existing_values_win_over_extraction() {
        let raw = success_response(json!("Storage: 256GB\nSIM-Lock: Locked"));
        let mut cached = normalize_payload(&raw, "30");
        cached.manufacturer = None;
        cached.model_name = None;
        cached.carrier = None;
        cached.purchase_country = None;
        cached.storage = Some("512GB".to_string());

        let out = rehydrate(cached, "30");
        assert_eq!(out.storage.as_deref(), Some("512GB"));
        assert_eq!(out.sim_lock.as_deref(), Some("Locked"));
    }

    #[test]
    fn no_raw_payload_returns_unchanged() {
        let raw = success_response(json!({}));
        let mut cached = normalize_payload(&raw, "30");
        cached.raw_response = None;
        cached.raw_result = None;

        let out = rehydrate(cached.clone(), "30");
        assert_eq!(out, cached);
    }

    #[test]
    fn backfills_service_name_from_catalog() {
        let raw = success_response(json!({}));
        let mut cached = normalize_payload(&raw, "30");
        cached.service_name = None;
        cached.service_id = String::new();

        let out = rehydrate(cached, "203");
        assert_eq!(out.service_id, "203");
        assert_eq!(out.service_name.as_deref(), Some("Brand & Model Info"));
    }
}
