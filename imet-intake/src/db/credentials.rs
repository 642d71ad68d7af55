//! Per-tenant credential reads
//!
//! Credential CRUD lives in an external admin surface; this core only reads
//! the row to resolve the provider API key and sheet configuration for a
//! lookup. A missing row falls back to the service-level configuration.

use sqlx::{Row, SqlitePool};

use imet_common::Result;

/// Per-tenant provider and sheet credentials
#[derive(Debug, Clone, Default)]
pub struct TenantCredential {
    pub tenant_id: String,
    pub provider_api_key: Option<String>,
    pub sheet_id: Option<String>,
    pub sheet_tab: Option<String>,
    pub utc_offset_minutes: Option<i32>,
    pub sync_to_sheets: bool,
}

pub async fn fetch_credential(
    pool: &SqlitePool,
    tenant_id: &str,
) -> Result<Option<TenantCredential>> {
    let row = sqlx::query(
        r#"
        SELECT tenant_id, provider_api_key, sheet_id, sheet_tab,
               utc_offset_minutes, sync_to_sheets
        FROM credentials
        WHERE tenant_id = ?
        "#,
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| TenantCredential {
        tenant_id: row.get("tenant_id"),
        provider_api_key: row.get("provider_api_key"),
        sheet_id: row.get("sheet_id"),
        sheet_tab: row.get("sheet_tab"),
        utc_offset_minutes: row.get::<Option<i64>, _>("utc_offset_minutes").map(|v| v as i32),
        sync_to_sheets: row.get::<i64, _>("sync_to_sheets") != 0,
    }))
}
