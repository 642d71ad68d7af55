//! Database access for the intake service
//!
//! One SQLite database holds the append-only lookup log (which doubles as
//! the lookup cache) and the per-tenant credential rows.

pub mod credentials;
pub mod lookups;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the intake tables if they don't exist.
///
/// Public so tests can run it against `sqlite::memory:` pools.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lookups (
            id TEXT PRIMARY KEY,
            imei TEXT NOT NULL,
            serial INTEGER NOT NULL DEFAULT 0,
            service_id TEXT NOT NULL,
            service_name TEXT,
            source TEXT NOT NULL,
            status TEXT NOT NULL,
            price REAL,
            balance REAL,
            user_grade TEXT,
            user_cost REAL,
            carrier TEXT,
            model_name TEXT,
            blacklist_status TEXT,
            sim_lock TEXT,
            purchase_country TEXT,
            checked_at TEXT NOT NULL,
            tenant_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            result_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Serves the cache lookup: newest success per (tenant, imei, service)
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_lookups_cache
        ON lookups (tenant_id, imei, service_id, status, created_at)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS credentials (
            tenant_id TEXT PRIMARY KEY,
            provider_api_key TEXT,
            sheet_id TEXT,
            sheet_tab TEXT,
            utc_offset_minutes INTEGER,
            sync_to_sheets INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (lookups, credentials)");

    Ok(())
}
