//! Shared database access for Gantry services
//!
//! All services read and write one SQLite database in the data folder.
//! Schema creation is idempotent; services call [`init_database_pool`] at
//! startup and share the resulting pool.

pub mod schema;

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the shared gantry.db, creating the file and the schema
/// when missing.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    schema::initialize_schema(&pool).await?;

    Ok(pool)
}
