//! gantry-si - Schedule Import Service
//!
//! Imports uploaded project-schedule documents: parses them through the
//! external parsing service, rebuilds the work-breakdown structure and
//! dependency graph, atomically replaces the project's stored schedule,
//! and reconciles orphaned hour entries against the new tasks.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use gantry_si::config::ServiceConfig;
use gantry_si::files::LocalFileStore;
use gantry_si::services::parser_client::ParserClient;
use gantry_si::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting gantry-si (Schedule Import) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    info!("Database: {}", config.database_path.display());
    info!("Parser endpoint: {}", config.parser_url);

    let db_pool = gantry_common::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let parser = ParserClient::new(
        config.parser_url.clone(),
        std::time::Duration::from_secs(config.parse_timeout_secs),
    )
    .map_err(|e| anyhow::anyhow!("Failed to build parser client: {}", e))?;

    let files = Arc::new(LocalFileStore::new(config.storage_root.clone()));

    let port = config.port;
    let state = AppState::new(db_pool, parser, files, config);
    let app = gantry_si::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("Listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
