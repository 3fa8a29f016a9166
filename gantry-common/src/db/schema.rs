//! Schedule schema bootstrap and live-column introspection
//!
//! Tables are created with `CREATE TABLE IF NOT EXISTS`; deployments may
//! carry additional columns added out-of-band, so writers discover the
//! live column set through [`table_columns`] instead of assuming the
//! compiled definition is exhaustive.

use crate::Result;
use sqlx::{Row, SqlitePool};

/// Create the project-controls tables when missing
///
/// Idempotent; safe to run at every service startup.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            name TEXT,
            portfolio_id TEXT,
            customer_id TEXT,
            site_id TEXT,
            has_schedule INTEGER NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_documents (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            storage_path TEXT NOT NULL,
            doc_type TEXT NOT NULL DEFAULT 'schedule',
            is_current_version INTEGER NOT NULL DEFAULT 0,
            uploaded_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            portfolio_id TEXT,
            customer_id TEXT,
            site_id TEXT,
            name TEXT,
            baseline_start TEXT,
            baseline_end TEXT,
            actual_start TEXT,
            actual_end TEXT,
            baseline_hours REAL,
            actual_hours REAL,
            baseline_cost REAL,
            actual_cost REAL,
            percent_complete REAL,
            comments TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phases (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            unit_id TEXT,
            portfolio_id TEXT,
            customer_id TEXT,
            site_id TEXT,
            name TEXT,
            baseline_start TEXT,
            baseline_end TEXT,
            actual_start TEXT,
            actual_end TEXT,
            baseline_hours REAL,
            actual_hours REAL,
            baseline_cost REAL,
            actual_cost REAL,
            percent_complete REAL,
            comments TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            unit_id TEXT,
            phase_id TEXT,
            portfolio_id TEXT,
            customer_id TEXT,
            site_id TEXT,
            name TEXT,
            phase_name TEXT,
            baseline_start TEXT,
            baseline_end TEXT,
            actual_start TEXT,
            actual_end TEXT,
            baseline_hours REAL,
            actual_hours REAL,
            baseline_cost REAL,
            actual_cost REAL,
            percent_complete REAL,
            comments TEXT,
            predecessors TEXT NOT NULL DEFAULT '[]',
            successors TEXT NOT NULL DEFAULT '[]',
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS dependencies (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            predecessor_task_id TEXT NOT NULL,
            successor_task_id TEXT NOT NULL,
            relationship_type TEXT NOT NULL DEFAULT 'FS',
            lag_days REAL NOT NULL DEFAULT 0,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS hour_entries (
            id TEXT PRIMARY KEY,
            project_id TEXT,
            task_id TEXT,
            phase_label TEXT,
            task_label TEXT,
            hours REAL,
            entry_date TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS project_logs (
            id TEXT PRIMARY KEY,
            project_id TEXT NOT NULL,
            log_type TEXT NOT NULL DEFAULT 'info',
            message TEXT NOT NULL,
            created_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Read the live column names of a table using PRAGMA table_info
///
/// Returns columns in database order. An empty result means the table
/// does not exist.
pub async fn table_columns<'e, E>(executor: E, table_name: &str) -> Result<Vec<String>>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(executor).await?;

    let mut columns: Vec<(i32, String)> = rows
        .iter()
        .map(|row| (row.get("cid"), row.get("name")))
        .collect();

    // Sort by cid to ensure consistent order
    columns.sort_by_key(|(cid, _)| *cid);

    Ok(columns.into_iter().map(|(_, name)| name).collect())
}

/// Check if a table exists
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name = ?
        )
        "#,
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
