//! Configuration resolution for the intake service
//!
//! Priority: environment variable, then TOML config, then compiled default.
//! Per-tenant credential rows override the provider key and sheet settings
//! again at lookup time.

use std::path::PathBuf;
use tracing::{info, warn};

use imet_common::config::TomlConfig;

use crate::services::sheet_mirror::{SheetMirrorConfig, DEFAULT_UTC_OFFSET_MINUTES};

pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://sickw.com/api.php";
pub const DEFAULT_PORT: u16 = 5731;
pub const DEFAULT_DATABASE_PATH: &str = "imet.db";

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Service-level provider API key; tenant credentials override it
    pub provider_api_key: Option<String>,
    pub provider_base_url: String,
    /// Used when a request supplies neither a service id nor a catalog key
    pub default_service_id: Option<String>,
    pub database_path: PathBuf,
    pub port: u16,
    pub sheet_id: Option<String>,
    pub sheet_tab: Option<String>,
    pub sheet_utc_offset_minutes: i32,
    pub sheet_sync_enabled: bool,
}

impl IntakeConfig {
    pub fn resolve(toml: &TomlConfig) -> Self {
        Self::resolve_from(toml, |name| std::env::var(name).ok())
    }

    /// Resolution with an injectable environment, for tests
    pub fn resolve_from(
        toml: &TomlConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env_non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let provider_api_key = env_non_empty("IMET_PROVIDER_API_KEY")
            .or_else(|| toml.provider_api_key.clone())
            .filter(|v| !v.trim().is_empty());

        let provider_base_url = env_non_empty("IMET_PROVIDER_BASE_URL")
            .or_else(|| toml.provider_base_url.clone())
            .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string());

        let default_service_id = env_non_empty("IMET_DEFAULT_SERVICE_ID")
            .or_else(|| toml.default_service_id.clone())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let database_path = env_non_empty("IMET_DATABASE_PATH")
            .or_else(|| toml.database_path.clone())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

        let port = env_non_empty("IMET_PORT")
            .and_then(|v| v.parse().ok())
            .or(toml.port)
            .unwrap_or(DEFAULT_PORT);

        let sheet_id = env_non_empty("IMET_SHEET_ID")
            .or_else(|| toml.sheet.sheet_id.clone())
            .filter(|v| !v.trim().is_empty());

        let sheet_tab = env_non_empty("IMET_SHEET_TAB")
            .or_else(|| toml.sheet.tab.clone())
            .filter(|v| !v.trim().is_empty());

        let config = Self {
            provider_api_key,
            provider_base_url,
            default_service_id,
            database_path,
            port,
            sheet_id,
            sheet_tab,
            sheet_utc_offset_minutes: toml
                .sheet
                .utc_offset_minutes
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
            sheet_sync_enabled: toml.sheet.sync_enabled.unwrap_or(true),
        };

        if config.provider_api_key.is_none() {
            warn!(
                "No provider API key configured (IMET_PROVIDER_API_KEY); \
                 lookups for tenants without a credential row will fail"
            );
        }
        if config.default_service_id.is_none() {
            info!("No default service id configured; requests must supply one");
        }

        config
    }

    /// Sheet mirroring defaults, before tenant credential overrides
    pub fn sheet_defaults(&self) -> SheetMirrorConfig {
        SheetMirrorConfig {
            sync_enabled: self.sheet_sync_enabled,
            sheet_id: self.sheet_id.clone(),
            tab: self.sheet_tab.clone(),
            utc_offset_minutes: self.sheet_utc_offset_minutes,
        }
    }
}
