//! Import log persistence
//!
//! The dashboards show each project's latest import log. The replace
//! transaction clears the previous generation's rows; the pipeline
//! appends the new import's lines after a successful run.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::diagnostics::ImportLog;

/// Append import log lines for a project
pub async fn append_logs(pool: &SqlitePool, project_id: &str, logs: &[ImportLog]) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();

    for log in logs {
        sqlx::query(
            "INSERT INTO project_logs (id, project_id, log_type, message, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(project_id)
        .bind(log.log_type.as_str())
        .bind(&log.message)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    Ok(())
}
