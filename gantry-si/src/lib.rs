//! gantry-si library interface
//!
//! Exposes the import pipeline and router assembly for integration
//! testing; the binary in `main.rs` is a thin wrapper around these.

pub mod api;
pub mod config;
pub mod db;
pub mod diagnostics;
pub mod error;
pub mod files;
pub mod models;
pub mod services;

pub use crate::error::{ImportError, ImportResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::files::FileStore;
use crate::services::parser_client::ParserClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database connection pool
    pub db: SqlitePool,
    /// External parsing service client
    pub parser: Arc<ParserClient>,
    /// Uploaded-document store
    pub files: Arc<dyn FileStore>,
    /// Service configuration
    pub config: ServiceConfig,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        parser: ParserClient,
        files: Arc<dyn FileStore>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            db,
            parser: Arc::new(parser),
            files,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
