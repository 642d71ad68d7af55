//! Lookup record persistence
//!
//! One row per lookup attempt, success or failure, never updated or deleted
//! here. The newest success row for (tenant, identifier, service) is the
//! cache entry consulted by the orchestrator. Every query is tenant-scoped;
//! a cross-tenant cache read would be a correctness violation, not just a
//! privacy leak.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use imet_common::{Error, Result};

use crate::error::LookupError;
use crate::models::{LookupContext, NormalizedDeviceInfo, RecentLookup};

/// Row written for one lookup attempt
#[derive(Debug, Clone)]
pub struct LookupRecord {
    pub id: Uuid,
    pub imei: String,
    pub serial: bool,
    pub service_id: String,
    pub service_name: Option<String>,
    pub source: String,
    pub status: String,
    pub price: Option<f64>,
    pub balance: Option<f64>,
    pub user_grade: Option<String>,
    pub user_cost: Option<f64>,
    pub carrier: Option<String>,
    pub model_name: Option<String>,
    pub blacklist_status: Option<String>,
    pub sim_lock: Option<String>,
    pub purchase_country: Option<String>,
    pub checked_at: DateTime<Utc>,
    pub tenant_id: String,
    pub actor_id: String,
    pub result_json: Value,
}

impl LookupRecord {
    /// Build the row for a live success, with any user overlay already
    /// applied to `info`
    pub fn from_success(
        info: &NormalizedDeviceInfo,
        context: &LookupContext,
        serial: bool,
    ) -> Result<Self> {
        let result_json = serde_json::to_value(info)
            .map_err(|e| Error::Internal(format!("Failed to serialize lookup result: {}", e)))?;

        Ok(Self {
            id: Uuid::new_v4(),
            imei: info.imei.clone(),
            serial,
            service_id: info.service_id.clone(),
            service_name: info.service_name.clone(),
            source: "live".to_string(),
            status: info.status.as_str().to_string(),
            price: info.provider_price,
            balance: info.provider_balance_after,
            user_grade: info.user_grade.clone(),
            user_cost: info.user_cost,
            carrier: info.carrier.clone(),
            model_name: info.model_name.clone(),
            blacklist_status: info.blacklist_status.clone(),
            sim_lock: info.sim_lock.clone(),
            purchase_country: info.purchase_country.clone(),
            checked_at: info.checked_at,
            tenant_id: context.tenant_id.clone(),
            actor_id: context.actor_id.clone(),
            result_json,
        })
    }

    /// Build the error-telemetry row for a failed provider call. The result
    /// payload is a small envelope, not a device record.
    #[allow(clippy::too_many_arguments)]
    pub fn from_error(
        identifier: &str,
        serial: bool,
        service_id: &str,
        error: &LookupError,
        user_grade: Option<String>,
        user_cost: Option<f64>,
        context: &LookupContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            imei: identifier.to_string(),
            serial,
            service_id: service_id.to_string(),
            service_name: None,
            source: "error".to_string(),
            status: "error".to_string(),
            price: None,
            balance: None,
            user_grade,
            user_cost,
            carrier: None,
            model_name: None,
            blacklist_status: None,
            sim_lock: None,
            purchase_country: None,
            checked_at: now,
            tenant_id: context.tenant_id.clone(),
            actor_id: context.actor_id.clone(),
            result_json: json!({
                "code": error.code,
                "message": error.message,
                "timestamp": now.to_rfc3339(),
            }),
        }
    }
}

/// Insert one lookup attempt
pub async fn insert_lookup(pool: &SqlitePool, record: &LookupRecord) -> Result<()> {
    let result_json = serde_json::to_string(&record.result_json)
        .map_err(|e| Error::Internal(format!("Failed to serialize result_json: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO lookups (
            id, imei, serial, service_id, service_name, source, status,
            price, balance, user_grade, user_cost, carrier, model_name,
            blacklist_status, sim_lock, purchase_country, checked_at,
            tenant_id, actor_id, result_json, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(&record.imei)
    .bind(record.serial)
    .bind(&record.service_id)
    .bind(&record.service_name)
    .bind(&record.source)
    .bind(&record.status)
    .bind(record.price)
    .bind(record.balance)
    .bind(&record.user_grade)
    .bind(record.user_cost)
    .bind(&record.carrier)
    .bind(&record.model_name)
    .bind(&record.blacklist_status)
    .bind(&record.sim_lock)
    .bind(&record.purchase_country)
    .bind(record.checked_at.to_rfc3339())
    .bind(&record.tenant_id)
    .bind(&record.actor_id)
    .bind(result_json)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Newest successful result payload for (tenant, identifier, service).
///
/// Returns the stored result_json text; the orchestrator owns deserialization
/// so a corrupt historical row can be demoted to a cache miss there.
pub async fn find_cached_success(
    pool: &SqlitePool,
    tenant_id: &str,
    imei: &str,
    service_id: &str,
) -> Result<Option<String>> {
    let row = sqlx::query(
        r#"
        SELECT result_json FROM lookups
        WHERE tenant_id = ? AND imei = ? AND service_id = ? AND status = 'success'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .bind(imei)
    .bind(service_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.get("result_json")))
}

/// Newest lookup attempts for the tenant's history view
pub async fn recent_lookups(
    pool: &SqlitePool,
    tenant_id: &str,
    limit: i64,
) -> Result<Vec<RecentLookup>> {
    let rows = sqlx::query(
        r#"
        SELECT id, imei, service_id, service_name, status, price, balance,
               model_name, carrier, blacklist_status, created_at
        FROM lookups
        WHERE tenant_id = ?
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(tenant_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let created_at: String = row.get("created_at");
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(RecentLookup {
                id: row.get("id"),
                imei: row.get("imei"),
                service_id: row.get("service_id"),
                service_name: row.get("service_name"),
                status: row.get("status"),
                price: row.get("price"),
                balance: row.get("balance"),
                model_name: row.get("model_name"),
                carrier: row.get("carrier"),
                blacklist_status: row.get("blacklist_status"),
                created_at,
            })
        })
        .collect()
}
