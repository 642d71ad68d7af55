//! Configuration file loading
//!
//! TOML config discovery follows the platform convention: an explicit path
//! wins, then `~/.config/imet/imet.toml`, then `/etc/imet/imet.toml` on
//! Linux. Environment overrides are applied by the service crate on top of
//! whatever this module returns.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sheet mirroring defaults from the config file
///
/// Per-tenant credential rows override these at lookup time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetTomlConfig {
    /// Target spreadsheet id
    pub sheet_id: Option<String>,
    /// Fixed tab name; when absent the mirror derives a dated tab title
    pub tab: Option<String>,
    /// Fixed UTC offset in minutes used for sheet-facing date formatting
    pub utc_offset_minutes: Option<i32>,
    /// Master switch for mirroring
    pub sync_enabled: Option<bool>,
}

/// Raw TOML configuration for the intake service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Provider API key (lookups without one fail classified at call time)
    pub provider_api_key: Option<String>,
    /// Provider endpoint; compiled default applies when absent
    pub provider_base_url: Option<String>,
    /// Service id used when a request supplies neither id nor key
    pub default_service_id: Option<String>,
    /// SQLite database file path
    pub database_path: Option<String>,
    /// HTTP listen port
    pub port: Option<u16>,
    #[serde(default)]
    pub sheet: SheetTomlConfig,
}

/// Load configuration from an explicit path or the platform default location.
///
/// A missing file is not an error; it yields the default (empty) config so
/// environment variables and compiled defaults can take over.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path() {
            Some(p) => p,
            None => return Ok(TomlConfig::default()),
        },
    };

    if !path.exists() {
        tracing::debug!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Locate the platform config file, if any exists
fn default_config_path() -> Option<PathBuf> {
    if let Some(user_config) = dirs::config_dir().map(|d| d.join("imet").join("imet.toml")) {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/imet/imet.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}
