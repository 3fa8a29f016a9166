//! Hour-entry queries for reconciliation
//!
//! Hour entries are owned by the time-tracking import; the only field
//! this service ever writes is the task link.

use anyhow::Result;
use sqlx::{Row as _, SqlitePool};

use crate::services::reconciler::UnassignedEntry;

/// Load the project's hour entries with no task link
pub async fn load_unassigned(pool: &SqlitePool, project_id: &str) -> Result<Vec<UnassignedEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, phase_label, task_label
        FROM hour_entries
        WHERE project_id = ? AND (task_id IS NULL OR task_id = '')
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| UnassignedEntry {
            id: row.get("id"),
            phase_label: row.get::<Option<String>, _>("phase_label").unwrap_or_default(),
            task_label: row.get::<Option<String>, _>("task_label").unwrap_or_default(),
        })
        .collect())
}

/// Link one hour entry to a task
pub async fn assign_task(pool: &SqlitePool, entry_id: &str, task_id: &str) -> Result<()> {
    sqlx::query(
        "UPDATE hour_entries SET task_id = ?, updated_at = ? WHERE id = ?",
    )
    .bind(task_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(entry_id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_and_assign_roundtrip() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        gantry_common::db::schema::initialize_schema(&pool)
            .await
            .unwrap();

        sqlx::query(
            r#"
            INSERT INTO hour_entries (id, project_id, task_id, phase_label, task_label, hours) VALUES
                ('H1', 'proj-1', NULL, 'Civil', 'Excavate A', 8.0),
                ('H2', 'proj-1', '',   'Civil', 'Pour Slab', 4.0),
                ('H3', 'proj-1', 'T9', 'Civil', 'Linked already', 2.0),
                ('H4', 'proj-2', NULL, 'Other', 'Other project', 1.0)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let unassigned = load_unassigned(&pool, "proj-1").await.unwrap();
        let mut ids: Vec<&str> = unassigned.iter().map(|e| e.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["H1", "H2"]);

        assign_task(&pool, "H1", "T1").await.unwrap();

        let remaining = load_unassigned(&pool, "proj-1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "H2");
    }
}
