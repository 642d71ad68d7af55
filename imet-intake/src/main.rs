//! imet-intake - Device intake lookup service
//!
//! Validates IMEIs and serial numbers, queries the paid device-lookup
//! provider, caches results per tenant in SQLite, and mirrors successful
//! lookups to a tenant spreadsheet.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use imet_intake::config::IntakeConfig;
use imet_intake::services::{HttpDeviceProvider, LoggingSheetTransport, SheetMirror};
use imet_intake::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting imet-intake");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = imet_common::config::load_toml_config(None)?;
    let config = IntakeConfig::resolve(&toml_config);

    info!("Database: {}", config.database_path.display());
    let db_pool = imet_intake::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let provider = Arc::new(
        HttpDeviceProvider::new(config.provider_base_url.clone())
            .map_err(|e| anyhow::anyhow!("Failed to build provider client: {}", e))?,
    );

    // TODO: wire the Google Sheets transport once service-account credentials
    // land; until then rows are logged instead of appended.
    let mirror = SheetMirror::new(Arc::new(LoggingSheetTransport));

    let port = config.port;
    let state = AppState::new(db_pool, provider, mirror, config);
    let app = imet_intake::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
