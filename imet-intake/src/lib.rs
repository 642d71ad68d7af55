//! imet-intake library interface
//!
//! Exposes the lookup pipeline and HTTP surface for integration testing.

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{LookupError, LookupErrorCode, LookupResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::IntakeConfig;
use crate::services::{LookupOrchestrator, SheetMirror};
use crate::services::provider::DeviceProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Lookup pipeline entry point
    pub orchestrator: Arc<LookupOrchestrator>,
    /// Resolved runtime configuration
    pub config: IntakeConfig,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn DeviceProvider>,
        mirror: SheetMirror,
        config: IntakeConfig,
    ) -> Self {
        let orchestrator = Arc::new(LookupOrchestrator::new(
            db.clone(),
            provider,
            mirror,
            config.clone(),
        ));

        Self {
            db,
            orchestrator,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::lookup_routes())
        .merge(api::history_routes())
        .merge(api::provider_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
