//! Atomic schedule replacement
//!
//! Every import fully supersedes the previous generation of a project's
//! schedule: one transaction deletes the old Units/Phases/Tasks/
//! Dependencies and reinserts the new set. A reader can never observe a
//! schedule that is partially old and partially new. Encapsulated as a
//! named operation so an incremental diff-based upsert could replace it
//! later without touching callers.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::db::upsert::{TableUpsert, UpsertOptions};
use crate::diagnostics::DiagnosticTrail;
use crate::models::{ConvertedPlan, Row};

/// Row counts from a committed replace
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOutcome {
    pub units_saved: usize,
    pub phases_saved: usize,
    pub tasks_saved: usize,
    pub deps_saved: usize,
}

/// One project's delete+reinsert, bounded by a single transaction
pub struct ReplaceTransaction {
    tx: Transaction<'static, Sqlite>,
    project_id: String,
    batch_size: usize,
}

impl ReplaceTransaction {
    /// Open the transaction
    ///
    /// Same-project imports are not serialized beyond the transaction's
    /// own isolation; two overlapping imports for one project can race
    /// at the delete phase.
    pub async fn begin(
        pool: &SqlitePool,
        project_id: &str,
        batch_size: usize,
    ) -> anyhow::Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self {
            tx,
            project_id: project_id.to_string(),
            batch_size,
        })
    }

    /// Run the full replace; commit on success, roll back on any error
    pub async fn execute(
        mut self,
        plan: &ConvertedPlan,
        dependencies: &[Row],
        document_id: &str,
        trail: &mut DiagnosticTrail,
    ) -> anyhow::Result<ReplaceOutcome> {
        match self.run(plan, dependencies, document_id, trail).await {
            Ok(outcome) => {
                self.tx.commit().await?;
                trail.push("replace transaction committed");
                Ok(outcome)
            }
            Err(e) => {
                trail.push(format!("replace transaction rolled back: {}", e));
                if let Err(rollback_err) = self.tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        plan: &ConvertedPlan,
        dependencies: &[Row],
        document_id: &str,
        trail: &mut DiagnosticTrail,
    ) -> anyhow::Result<ReplaceOutcome> {
        let now = Utc::now().to_rfc3339();
        trail.push(format!(
            "replace transaction started for project {}",
            self.project_id
        ));

        sqlx::query("UPDATE projects SET has_schedule = 1, updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&self.project_id)
            .execute(&mut *self.tx)
            .await?;

        // Previous generation out, dependencies first: their endpoints
        // reference the task rows deleted right after
        let deps_deleted = sqlx::query(
            r#"
            DELETE FROM dependencies
            WHERE predecessor_task_id IN (SELECT id FROM tasks WHERE project_id = ?)
               OR successor_task_id IN (SELECT id FROM tasks WHERE project_id = ?)
            "#,
        )
        .bind(&self.project_id)
        .bind(&self.project_id)
        .execute(&mut *self.tx)
        .await?
        .rows_affected();

        for table in ["tasks", "units", "phases", "project_logs"] {
            let query = format!("DELETE FROM {} WHERE project_id = ?", table);
            sqlx::query(&query)
                .bind(&self.project_id)
                .execute(&mut *self.tx)
                .await?;
        }
        trail.push(format!(
            "previous schedule generation deleted ({} dependency rows)",
            deps_deleted
        ));

        // New generation in, parents before children so later upserts
        // can assume earlier ones landed
        let mut outcome = ReplaceOutcome::default();

        let wbs_options = self.wbs_options();
        let units = TableUpsert::prepare(&mut *self.tx, "units", wbs_options).await?;
        outcome.units_saved = units.upsert_rows(&mut *self.tx, &plan.units).await?.persisted;
        trail.push(format!("units upserted: {}", outcome.units_saved));

        let wbs_options = self.wbs_options();
        let phases = TableUpsert::prepare(&mut *self.tx, "phases", wbs_options).await?;
        outcome.phases_saved = phases
            .upsert_rows(&mut *self.tx, &plan.phases)
            .await?
            .persisted;
        trail.push(format!("phases upserted: {}", outcome.phases_saved));

        let tasks = TableUpsert::prepare(
            &mut *self.tx,
            "tasks",
            UpsertOptions {
                batch_size: self.batch_size,
                id_fallbacks: &["taskId", "uid"],
                json_list_columns: &["predecessors", "successors"],
            },
        )
        .await?;
        let task_outcome = tasks.upsert_rows(&mut *self.tx, &plan.tasks).await?;
        outcome.tasks_saved = task_outcome.persisted;
        if task_outcome.discarded > 0 {
            trail.warning(format!(
                "{} tasks discarded for missing identifiers",
                task_outcome.discarded
            ));
        }
        trail.push(format!("tasks upserted: {}", outcome.tasks_saved));

        let wbs_options = self.wbs_options();
        let deps = TableUpsert::prepare(&mut *self.tx, "dependencies", wbs_options).await?;
        outcome.deps_saved = deps.upsert_rows(&mut *self.tx, dependencies).await?.persisted;
        trail.push(format!("dependencies upserted: {}", outcome.deps_saved));

        // The imported document becomes the current version of its type
        sqlx::query(
            r#"
            UPDATE schedule_documents SET is_current_version = 0
            WHERE project_id = ?
              AND doc_type = (SELECT doc_type FROM schedule_documents WHERE id = ?)
              AND id <> ?
            "#,
        )
        .bind(&self.project_id)
        .bind(document_id)
        .bind(document_id)
        .execute(&mut *self.tx)
        .await?;

        sqlx::query("UPDATE schedule_documents SET is_current_version = 1 WHERE id = ?")
            .bind(document_id)
            .execute(&mut *self.tx)
            .await?;
        trail.push(format!("document {} marked current", document_id));

        Ok(outcome)
    }

    fn wbs_options(&self) -> UpsertOptions {
        UpsertOptions {
            batch_size: self.batch_size,
            ..Default::default()
        }
    }
}
