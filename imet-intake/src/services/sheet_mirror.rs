//! Spreadsheet mirroring
//!
//! Every successful lookup is appended to a tenant-configured spreadsheet
//! tab as a flat display row. This module owns the row/tab derivation and
//! the append contract (missing tabs are created and seeded with a header
//! row); the Google-specific OAuth/HTTP plumbing lives behind the
//! `SheetTransport` trait and is wired at the composition root.
//!
//! Mirroring is strictly best-effort: transport failures are logged and
//! swallowed, never surfaced to the lookup caller.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

use crate::models::{LookupStatus, NormalizedDeviceInfo};

/// Header row seeded into freshly created tabs
pub const SHEET_HEADERS: [&str; 8] = [
    "Product",
    "Storage",
    "Grade",
    "IMEI/SN",
    "Cost",
    "Carrier",
    "Lock Status",
    "Date",
];

/// Default sheet-facing UTC offset (America/Chicago standard time)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = -360;

/// Resolved mirroring configuration for one append
#[derive(Debug, Clone)]
pub struct SheetMirrorConfig {
    pub sync_enabled: bool,
    pub sheet_id: Option<String>,
    /// Fixed tab name; empty/absent derives a dated tab from `checked_at`
    pub tab: Option<String>,
    pub utc_offset_minutes: i32,
}

impl Default for SheetMirrorConfig {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            sheet_id: None,
            tab: None,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
        }
    }
}

/// Transport seam for the spreadsheet backend
#[async_trait]
pub trait SheetTransport: Send + Sync {
    /// Create the tab and seed `headers` if it does not exist yet
    async fn ensure_tab(
        &self,
        sheet_id: &str,
        title: &str,
        headers: &[&str],
    ) -> anyhow::Result<()>;

    /// Append one row to an existing tab
    async fn append_row(&self, sheet_id: &str, tab: &str, row: &[String]) -> anyhow::Result<()>;
}

/// Fallback transport for deployments without sheet credentials: logs the
/// row instead of writing anywhere.
pub struct LoggingSheetTransport;

#[async_trait]
impl SheetTransport for LoggingSheetTransport {
    async fn ensure_tab(
        &self,
        sheet_id: &str,
        title: &str,
        _headers: &[&str],
    ) -> anyhow::Result<()> {
        tracing::debug!(sheet_id = %sheet_id, tab = %title, "Sheet transport disabled; tab ensure skipped");
        Ok(())
    }

    async fn append_row(&self, sheet_id: &str, tab: &str, row: &[String]) -> anyhow::Result<()> {
        tracing::info!(sheet_id = %sheet_id, tab = %tab, row = ?row, "Sheet transport disabled; row logged only");
        Ok(())
    }
}

/// Case-insensitive lock status simplification: "unlock" anywhere wins, then
/// "lock", else the value passes through verbatim
pub fn simplify_lock_status(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let lower = value.to_lowercase();
    if lower.contains("unlock") {
        "Unlocked".to_string()
    } else if lower.contains("lock") {
        "Locked".to_string()
    } else {
        value.to_string()
    }
}

fn local_time(checked_at: DateTime<Utc>, utc_offset_minutes: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    checked_at.with_timezone(&offset)
}

/// "Aug 29, 2026 03:04 PM" in the tenant's offset
pub fn format_sheet_date(checked_at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    local_time(checked_at, utc_offset_minutes)
        .format("%b %d, %Y %I:%M %p")
        .to_string()
}

/// Uppercased "MONTH DAY" default tab title, e.g. "AUGUST 29"
pub fn daily_tab_title(checked_at: DateTime<Utc>, utc_offset_minutes: i32) -> String {
    local_time(checked_at, utc_offset_minutes)
        .format("%B %-d")
        .to_string()
        .to_uppercase()
}

/// Build the display row for one successful lookup
pub fn build_row(info: &NormalizedDeviceInfo, utc_offset_minutes: i32) -> Vec<String> {
    let cost_display = match info.user_cost {
        Some(cost) if cost.is_finite() => format!("${}", cost),
        _ => String::new(),
    };

    vec![
        info.model_name
            .clone()
            .or_else(|| info.description.clone())
            .unwrap_or_default(),
        info.storage.clone().unwrap_or_default(),
        info.user_grade.clone().unwrap_or_default(),
        info.imei.clone(),
        cost_display,
        info.carrier.clone().unwrap_or_default(),
        simplify_lock_status(info.sim_lock.as_deref()),
        format_sheet_date(info.checked_at, utc_offset_minutes),
    ]
}

/// Row/tab derivation in front of a pluggable transport
#[derive(Clone)]
pub struct SheetMirror {
    transport: Arc<dyn SheetTransport>,
}

impl SheetMirror {
    pub fn new(transport: Arc<dyn SheetTransport>) -> Self {
        Self { transport }
    }

    /// Append one successful lookup to the configured sheet.
    ///
    /// Skips silently when mirroring is disabled, the record is not a
    /// success, or no sheet id is configured. Transport errors are logged at
    /// warn and swallowed.
    pub async fn append_lookup(&self, info: &NormalizedDeviceInfo, config: &SheetMirrorConfig) {
        if !config.sync_enabled || info.status != LookupStatus::Success {
            return;
        }
        let Some(sheet_id) = config.sheet_id.as_deref().filter(|s| !s.is_empty()) else {
            return;
        };

        let tab = config
            .tab
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| daily_tab_title(info.checked_at, config.utc_offset_minutes));

        let row = build_row(info, config.utc_offset_minutes);

        if let Err(e) = self.transport.ensure_tab(sheet_id, &tab, &SHEET_HEADERS).await {
            tracing::warn!(sheet_id = %sheet_id, tab = %tab, error = %e, "Sheet tab ensure failed");
            return;
        }

        if let Err(e) = self.transport.append_row(sheet_id, &tab, &row).await {
            tracing::warn!(sheet_id = %sheet_id, tab = %tab, error = %e, "Sheet append failed");
            return;
        }

        tracing::debug!(sheet_id = %sheet_id, tab = %tab, identifier = %info.imei, "Mirrored lookup to sheet");
    }
}
