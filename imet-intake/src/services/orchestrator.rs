//! Lookup orchestration
//!
//! One entry point, `LookupOrchestrator::process`, drives a single identifier
//! through the full pipeline: validate, resolve the provider service, consult
//! the tenant-scoped cache, call the provider on a miss, normalize, persist,
//! and mirror to the tenant's spreadsheet.
//!
//! Cache hits are mirrored too: the sheet is an intake log of every checked
//! unit, not a log of paid provider calls.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::catalog::service_meta_by_key;
use crate::config::IntakeConfig;
use crate::db::credentials::{fetch_credential, TenantCredential};
use crate::db::lookups::{find_cached_success, insert_lookup, LookupRecord};
use crate::error::{LookupError, LookupErrorCode, LookupResult};
use crate::models::{
    LookupContext, LookupOutcome, LookupRequest, LookupSource, NormalizedDeviceInfo,
};
use crate::services::normalizer::{extract_error, normalize_payload};
use crate::services::provider::{validate_service_id, DeviceProvider};
use crate::services::rehydrator::rehydrate;
use crate::services::sheet_mirror::{SheetMirror, SheetMirrorConfig};
use crate::services::validator::{
    is_valid_imei, is_valid_serial, sanitize_imei, sanitize_serial,
};

/// Sanitize the request identifier and reject it if malformed.
///
/// Returns the cleaned identifier used for caching, the provider call, and
/// persistence.
pub fn validate_identifier(raw: &str, serial_mode: bool) -> LookupResult<String> {
    if serial_mode {
        let serial = sanitize_serial(raw);
        if !is_valid_serial(&serial) {
            return Err(LookupError::new(
                LookupErrorCode::E02InvalidSn,
                "Invalid serial number. Serial numbers must be 5 to 40 characters.",
            ));
        }
        Ok(serial)
    } else {
        let imei = sanitize_imei(raw);
        if !is_valid_imei(&imei) {
            return Err(LookupError::new(
                LookupErrorCode::E01InvalidImei,
                "Invalid IMEI. An IMEI is 14 to 17 digits and must pass the Luhn check.",
            ));
        }
        Ok(imei)
    }
}

/// Resolve the provider service id for a request.
///
/// Priority: explicit `serviceId`, then a catalog `serviceKey`, then the
/// configured default. An unknown key or no source at all is a caller error.
pub fn resolve_service_id(
    request: &LookupRequest,
    default_service_id: Option<&str>,
) -> LookupResult<String> {
    if let Some(id) = request
        .service_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        return Ok(id.to_string());
    }

    if let Some(key) = request
        .service_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        return match service_meta_by_key(key) {
            Some(meta) => Ok(meta.id.to_string()),
            None => Err(LookupError::new(
                LookupErrorCode::S01ServiceInvalid,
                format!("Unknown service key: {}", key),
            )),
        };
    }

    default_service_id
        .map(str::to_string)
        .ok_or_else(|| {
            LookupError::new(
                LookupErrorCode::S01ServiceInvalid,
                "No service id supplied and no default is configured.",
            )
        })
}

/// Apply the operator-supplied grade/cost overlay to a normalized record.
///
/// A blank grade and a non-finite cost are no-ops, so a cached record's
/// stored overlay survives an empty re-submission.
pub fn apply_overlay(info: &mut NormalizedDeviceInfo, grade: Option<&str>, cost: Option<f64>) {
    if let Some(grade) = grade.map(str::trim).filter(|g| !g.is_empty()) {
        info.user_grade = Some(grade.to_string());
    }
    if let Some(cost) = cost.filter(|c| c.is_finite()) {
        info.user_cost = Some(cost);
    }
}

/// Drives single lookups end to end; the batch runner loops over this.
#[derive(Clone)]
pub struct LookupOrchestrator {
    db: SqlitePool,
    provider: Arc<dyn DeviceProvider>,
    mirror: SheetMirror,
    config: IntakeConfig,
}

impl LookupOrchestrator {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn DeviceProvider>,
        mirror: SheetMirror,
        config: IntakeConfig,
    ) -> Self {
        Self {
            db,
            provider,
            mirror,
            config,
        }
    }

    /// Process one lookup request for the given tenant/actor.
    pub async fn process(
        &self,
        request: &LookupRequest,
        context: &LookupContext,
    ) -> LookupResult<LookupOutcome> {
        let identifier =
            validate_identifier(request.imei.as_deref().unwrap_or(""), request.serial_mode)?;
        let service_id =
            resolve_service_id(request, self.config.default_service_id.as_deref())?;

        let credential = fetch_credential(&self.db, &context.tenant_id).await?;
        let sheet_config = self.sheet_config(credential.as_ref());

        if let Some(cached) = self
            .cached_result(&context.tenant_id, &identifier, &service_id)
            .await?
        {
            let mut info = rehydrate(cached, &service_id);
            apply_overlay(&mut info, request.grade.as_deref(), request.cost);

            debug!(
                tenant_id = %context.tenant_id,
                identifier = %identifier,
                service_id = %service_id,
                "Cache hit"
            );

            self.mirror.append_lookup(&info, &sheet_config).await;

            return Ok(LookupOutcome {
                source: LookupSource::Cache,
                data: info,
            });
        }

        let api_key = resolve_api_key(credential.as_ref(), self.config.provider_api_key.as_deref())?;

        info!(
            tenant_id = %context.tenant_id,
            identifier = %identifier,
            service_id = %service_id,
            "Cache miss; querying provider"
        );

        let raw = match self.provider.lookup(&identifier, &service_id, &api_key).await {
            Ok(raw) => raw,
            Err(error) => {
                self.record_error(&identifier, &service_id, &error, request, context)
                    .await;
                return Err(error);
            }
        };

        if let Some(error) = extract_error(&raw) {
            let error = self.enrich_incompatible_service(error, &service_id, &api_key).await;
            self.record_error(&identifier, &service_id, &error, request, context)
                .await;
            return Err(error);
        }

        let mut info = normalize_payload(&raw, &service_id);
        info.imei = identifier.clone();
        apply_overlay(&mut info, request.grade.as_deref(), request.cost);

        // Error-record writes are best-effort, but a success that cannot be
        // persisted would silently break the cache contract, so it fails.
        let record = LookupRecord::from_success(&info, context, request.serial_mode)?;
        insert_lookup(&self.db, &record).await?;

        self.mirror.append_lookup(&info, &sheet_config).await;

        Ok(LookupOutcome {
            source: LookupSource::Live,
            data: info,
        })
    }

    /// Provider API key for tenant-level endpoints (balance, service list).
    pub async fn api_key_for_tenant(&self, tenant_id: &str) -> LookupResult<String> {
        let credential = fetch_credential(&self.db, tenant_id).await?;
        resolve_api_key(credential.as_ref(), self.config.provider_api_key.as_deref())
    }

    pub fn provider(&self) -> &dyn DeviceProvider {
        self.provider.as_ref()
    }

    /// Newest cached success for (tenant, identifier, service), or None.
    ///
    /// A stored payload that no longer deserializes is demoted to a cache
    /// miss rather than failing the lookup.
    async fn cached_result(
        &self,
        tenant_id: &str,
        identifier: &str,
        service_id: &str,
    ) -> LookupResult<Option<NormalizedDeviceInfo>> {
        let Some(payload) = find_cached_success(&self.db, tenant_id, identifier, service_id).await?
        else {
            return Ok(None);
        };

        match serde_json::from_str(&payload) {
            Ok(info) => Ok(Some(info)),
            Err(e) => {
                warn!(
                    tenant_id = %tenant_id,
                    identifier = %identifier,
                    error = %e,
                    "Cached lookup payload is corrupt; treating as a miss"
                );
                Ok(None)
            }
        }
    }

    /// When the provider rejects the device/service pairing, check whether
    /// the service at least exists upstream and fold its name into the
    /// message. The code stays S02 either way.
    async fn enrich_incompatible_service(
        &self,
        error: LookupError,
        service_id: &str,
        api_key: &str,
    ) -> LookupError {
        if error.code != LookupErrorCode::S02ServiceIncompatible {
            return error;
        }

        let validation = validate_service_id(self.provider.as_ref(), api_key, service_id).await;
        if !validation.exists {
            return error;
        }

        let name = validation.name.unwrap_or_else(|| "unnamed".to_string());
        let raw = error.raw_message.clone();
        let mut enriched = LookupError::new(
            LookupErrorCode::S02ServiceIncompatible,
            format!(
                "Service #{} ({}) exists but doesn't support this device model. \
                 Try a different service for this device.",
                service_id, name
            ),
        );
        if let Some(raw) = raw {
            enriched = enriched.with_raw_message(raw);
        }
        enriched
    }

    /// Persist an error-telemetry row. Best-effort: a failed write is logged
    /// and the original error still flows back to the caller.
    async fn record_error(
        &self,
        identifier: &str,
        service_id: &str,
        error: &LookupError,
        request: &LookupRequest,
        context: &LookupContext,
    ) {
        let record = LookupRecord::from_error(
            identifier,
            request.serial_mode,
            service_id,
            error,
            request.grade.as_deref().map(str::trim).filter(|g| !g.is_empty()).map(str::to_string),
            request.cost.filter(|c| c.is_finite()),
            context,
            Utc::now(),
        );

        if let Err(e) = insert_lookup(&self.db, &record).await {
            warn!(identifier = %identifier, error = %e, "Failed to persist error record");
        }
    }

    /// Sheet settings for this tenant: credential row fields override the
    /// service-level defaults where present.
    fn sheet_config(&self, credential: Option<&TenantCredential>) -> SheetMirrorConfig {
        let mut config = self.config.sheet_defaults();
        if let Some(credential) = credential {
            config.sync_enabled = credential.sync_to_sheets;
            if credential.sheet_id.is_some() {
                config.sheet_id = credential.sheet_id.clone();
            }
            if credential.sheet_tab.is_some() {
                config.tab = credential.sheet_tab.clone();
            }
            if let Some(offset) = credential.utc_offset_minutes {
                config.utc_offset_minutes = offset;
            }
        }
        config
    }
}

/// Credential key wins over the service-level key; neither configured is an
/// authentication error reported before any provider call is made.
pub fn resolve_api_key(
    credential: Option<&TenantCredential>,
    config_key: Option<&str>,
) -> LookupResult<String> {
    credential
        .and_then(|c| c.provider_api_key.clone())
        .filter(|k| !k.trim().is_empty())
        .or_else(|| config_key.map(str::to_string))
        .ok_or_else(|| {
            LookupError::new(
                LookupErrorCode::A01ApiKeyInvalid,
                "No provider API key is configured for this tenant.",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    use crate::models::LookupStatus;

    #[test]
    fn identifier_validation_by_mode() {
        assert_eq!(
            validate_identifier("4901-5420-3237-518", false).unwrap(),
            "490154203237518"
        );
        assert_eq!(
            validate_identifier("  f2lw48xhhg04 ", true).unwrap(),
            "F2LW48XHHG04"
        );

        let err = validate_identifier("12345", false).unwrap_err();
        assert_eq!(err.code, LookupErrorCode::E01InvalidImei);

        let err = validate_identifier("ab", true).unwrap_err();
        assert_eq!(err.code, LookupErrorCode::E02InvalidSn);
    }

    #[test]
    fn service_resolution_priority() {
        let request = LookupRequest {
            service_id: Some(" 203 ".to_string()),
            service_key: Some("appleBasicInfo".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_service_id(&request, Some("6")).unwrap(), "203");

        let request = LookupRequest {
            service_key: Some("appleBasicInfo".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_service_id(&request, Some("6")).unwrap(), "30");

        let request = LookupRequest::default();
        assert_eq!(resolve_service_id(&request, Some("6")).unwrap(), "6");

        let err = resolve_service_id(&request, None).unwrap_err();
        assert_eq!(err.code, LookupErrorCode::S01ServiceInvalid);

        let request = LookupRequest {
            service_key: Some("noSuchKey".to_string()),
            ..Default::default()
        };
        let err = resolve_service_id(&request, Some("6")).unwrap_err();
        assert_eq!(err.code, LookupErrorCode::S01ServiceInvalid);
    }

    #[test]
    fn overlay_ignores_blank_and_non_finite_values() {
        let mut info = NormalizedDeviceInfo {
            imei: "490154203237518".to_string(),
            service_id: "30".to_string(),
            service_name: None,
            status: LookupStatus::Success,
            user_grade: Some("B".to_string()),
            user_cost: Some(100.0),
            manufacturer: None,
            model_name: None,
            model_code: None,
            storage: None,
            description: None,
            fmi_status: None,
            icloud_lock: None,
            blacklist_status: None,
            carrier: None,
            purchase_country: None,
            sim_lock: None,
            provider_price: None,
            provider_balance_after: None,
            raw_result: None,
            raw_response: None,
            checked_at: Utc::now(),
            extra_fields: BTreeMap::new(),
        };

        apply_overlay(&mut info, Some("  "), Some(f64::NAN));
        assert_eq!(info.user_grade.as_deref(), Some("B"));
        assert_eq!(info.user_cost, Some(100.0));

        apply_overlay(&mut info, Some(" A+ "), Some(225.5));
        assert_eq!(info.user_grade.as_deref(), Some("A+"));
        assert_eq!(info.user_cost, Some(225.5));
    }

    #[test]
    fn api_key_resolution_order() {
        let credential = TenantCredential {
            tenant_id: "t1".to_string(),
            provider_api_key: Some("tenant-key".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_api_key(Some(&credential), Some("service-key")).unwrap(),
            "tenant-key"
        );

        let blank = TenantCredential {
            tenant_id: "t1".to_string(),
            provider_api_key: Some("  ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            resolve_api_key(Some(&blank), Some("service-key")).unwrap(),
            "service-key"
        );

        let err = resolve_api_key(None, None).unwrap_err();
        assert_eq!(err.code, LookupErrorCode::A01ApiKeyInvalid);
        assert_eq!(err.status, 401);
    }
}
