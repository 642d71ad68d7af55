//! Batch lookup execution
//!
//! Batches run strictly sequentially with a small pacing delay between
//! items. The provider rate-limits aggressively and bills per call, so a
//! batch must never fan out concurrent paid lookups.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::{LookupError, LookupErrorCode, LookupResult};
use crate::models::{BatchItemResult, BatchLookupRequest, LookupContext};
use crate::services::orchestrator::{validate_identifier, LookupOrchestrator};
use crate::services::validator::{sanitize_imei, sanitize_serial};

/// Hard cap on identifiers per batch
pub const MAX_BATCH_SIZE: usize = 50;

/// Inter-item pacing when the request does not specify one
pub const DEFAULT_DELAY_MS: u64 = 350;

/// Upper clamp for requested pacing
pub const MAX_DELAY_MS: u64 = 2000;

/// Clamp the requested inter-item delay to [0, MAX_DELAY_MS].
pub fn effective_delay_ms(requested: Option<u64>) -> u64 {
    requested.unwrap_or(DEFAULT_DELAY_MS).min(MAX_DELAY_MS)
}

/// Sanitize each identifier for the request's mode and drop duplicates,
/// keeping first-seen order. Blank entries are dropped entirely.
pub fn sanitize_and_dedup(identifiers: &[String], serial_mode: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for raw in identifiers {
        let cleaned = if serial_mode {
            sanitize_serial(raw)
        } else {
            sanitize_imei(raw)
        };
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }

    out
}

/// Run a batch of lookups, one result per deduplicated identifier.
///
/// Emptiness and the size cap are judged on the cleaned list, not the raw
/// one: a batch that sanitizes down to nothing is rejected, and raw
/// duplicates do not count against the cap. Rejection happens before any
/// provider call; per-item failures are captured in place and never abort
/// the remaining items.
pub async fn run_batch(
    orchestrator: &LookupOrchestrator,
    request: &BatchLookupRequest,
    context: &LookupContext,
) -> LookupResult<Vec<BatchItemResult>> {
    let identifiers = sanitize_and_dedup(&request.imeis, request.serial_mode);

    if identifiers.is_empty() {
        return Err(LookupError::new(
            LookupErrorCode::Unknown,
            "No identifiers supplied.",
        ));
    }
    if identifiers.len() > MAX_BATCH_SIZE {
        return Err(LookupError::new(
            LookupErrorCode::Unknown,
            format!(
                "Batch size {} exceeds the maximum of {}.",
                identifiers.len(),
                MAX_BATCH_SIZE
            ),
        ));
    }
    let delay = Duration::from_millis(effective_delay_ms(request.delay_ms));

    info!(
        tenant_id = %context.tenant_id,
        submitted = request.imeis.len(),
        deduplicated = identifiers.len(),
        delay_ms = delay.as_millis() as u64,
        "Starting batch lookup"
    );

    let mut results = Vec::with_capacity(identifiers.len());

    for (index, identifier) in identifiers.iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        // Malformed entries are settled locally; only clean identifiers go
        // through the full pipeline.
        if let Err(error) = validate_identifier(identifier, request.serial_mode) {
            results.push(BatchItemResult::failure(
                identifier.clone(),
                error.message.clone(),
                error.code,
            ));
            continue;
        }

        let item_request = request.item_request(identifier);
        match orchestrator.process(&item_request, context).await {
            Ok(outcome) => {
                results.push(BatchItemResult::success(
                    identifier.clone(),
                    outcome.source,
                    outcome.data,
                ));
            }
            Err(error) => {
                warn!(
                    tenant_id = %context.tenant_id,
                    identifier = %identifier,
                    code = %error.code,
                    "Batch item failed"
                );
                results.push(BatchItemResult::failure(
                    identifier.clone(),
                    error.message.clone(),
                    error.code,
                ));
            }
        }
    }

    let failures = results.iter().filter(|r| !r.is_ok()).count();
    info!(
        tenant_id = %context.tenant_id,
        total = results.len(),
        failures,
        "Batch lookup finished"
    );

    Ok(results)
}
