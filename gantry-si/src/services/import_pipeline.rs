//! Schedule import orchestration
//!
//! One request, one synchronous logical pipeline: resolve the document,
//! download it, parse it upstream, normalize the payload, rebuild the
//! dependency graph, atomically replace the stored schedule, then
//! reconcile orphaned hour entries. Each step appends to the diagnostic
//! trail and advances the session state machine; a failure anywhere
//! lands the session in FAILED with the trail intact.

use serde_json::Value;

use crate::db::{documents, project_logs, replace::ReplaceTransaction};
use crate::diagnostics::DiagnosticTrail;
use crate::error::{ImportError, ImportResult};
use crate::models::{ConvertedPlan, ImportContext, ImportSession, ImportState, ImportSummary, Row};
use crate::services::{dependency_builder, plan_converter, reconciler};
use crate::AppState;

/// One import request's parameters
#[derive(Debug, Clone, Default)]
pub struct ImportRequest {
    pub document_id: String,
    pub project_id: String,
    pub portfolio_id: Option<String>,
    pub customer_id: Option<String>,
    pub site_id: Option<String>,
    /// Fallback document lookup key for older clients
    pub storage_path: Option<String>,
}

/// A completed import's result
#[derive(Debug)]
pub struct ImportOutcome {
    pub summary: ImportSummary,
    pub task_count: usize,
    pub tasks: Vec<Row>,
}

/// Run one schedule import end to end
pub async fn run_import(
    state: &AppState,
    request: ImportRequest,
    trail: &mut DiagnosticTrail,
) -> ImportResult<ImportOutcome> {
    let mut session = ImportSession::new(&request.project_id, &request.document_id);
    trail.info(format!(
        "Schedule import started for project {}",
        request.project_id
    ));

    match execute(state, &request, &mut session, trail).await {
        Ok(outcome) => {
            session.transition_to(ImportState::Completed);
            trail.success(format!(
                "Import complete: {} units, {} phases, {} tasks, {} dependencies",
                outcome.summary.units_saved,
                outcome.summary.phases_saved,
                outcome.summary.tasks_saved,
                outcome.summary.deps_saved
            ));

            // Best-effort: the dashboards read these, but a logging
            // hiccup must not fail a committed import
            if let Err(e) =
                project_logs::append_logs(&state.db, &request.project_id, trail.logs()).await
            {
                tracing::warn!(error = %e, "Failed to persist import logs");
            }

            tracing::info!(
                session_id = %session.session_id,
                project_id = %request.project_id,
                tasks_saved = outcome.summary.tasks_saved,
                "Schedule import completed"
            );
            Ok(outcome)
        }
        Err(e) => {
            session.transition_to(ImportState::Failed);
            trail.push(format!("import failed: {}", e));
            tracing::error!(
                session_id = %session.session_id,
                project_id = %request.project_id,
                error = %e,
                "Schedule import failed"
            );
            Err(e)
        }
    }
}

async fn execute(
    state: &AppState,
    request: &ImportRequest,
    session: &mut ImportSession,
    trail: &mut DiagnosticTrail,
) -> ImportResult<ImportOutcome> {
    // UPLOADED: resolve the document reference
    let document = documents::find_document(
        &state.db,
        &request.document_id,
        request.storage_path.as_deref(),
    )
    .await
    .map_err(ImportError::Transaction)?
    .ok_or_else(|| {
        ImportError::NotFound(format!("schedule document {}", request.document_id))
    })?;
    trail.push(format!(
        "document resolved: {} ({})",
        document.id, document.file_name
    ));

    // DOWNLOADING
    session.transition_to(ImportState::Downloading);
    trail.info(format!("Downloading {}", document.file_name));
    let bytes = state
        .files
        .fetch(&document.storage_path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ImportError::NotFound(format!(
                "stored document at {}",
                document.storage_path
            )),
            _ => ImportError::Transaction(e.into()),
        })?;
    trail.push(format!("downloaded {} bytes", bytes.len()));

    // PARSING: the external call, single attempt, hard timeout
    session.transition_to(ImportState::Parsing);
    trail.info("Submitting document to parsing service");
    let payload = state.parser.parse(&document.file_name, bytes).await?;
    if let Some(total) = parsed_task_total(&payload) {
        trail.push(format!("parser reported {} tasks", total));
    }

    // CONVERTING
    session.transition_to(ImportState::Converting);
    let ctx = ImportContext {
        project_id: request.project_id.clone(),
        portfolio_id: request.portfolio_id.clone(),
        customer_id: request.customer_id.clone(),
        site_id: request.site_id.clone(),
    };
    let plan = plan_converter::convert(&payload, &ctx)?;
    trail.info(format!(
        "Converted {} units, {} phases, {} tasks",
        plan.units.len(),
        plan.phases.len(),
        plan.tasks.len()
    ));

    let built = dependency_builder::build_dependencies(&plan.tasks, &request.project_id);
    trail.push(format!(
        "dependency graph: {} edges ({} self-loops, {} dangling, {} duplicates dropped)",
        built.stats.emitted,
        built.stats.self_loops_dropped,
        built.stats.missing_endpoint_dropped,
        built.stats.duplicates_dropped
    ));

    // REPLACING: the only all-or-nothing step
    session.transition_to(ImportState::Replacing);
    let replaced = replace_schedule(state, request, &plan, &built.rows, &document.id, trail).await?;

    // RECONCILING
    session.transition_to(ImportState::Reconciling);
    let reconciled = reconciler::reconcile_hours(&state.db, &request.project_id, &plan.tasks)
        .await
        .map_err(ImportError::Transaction)?;
    if reconciled.unassigned > reconciled.matched {
        trail.warning(format!(
            "{} of {} unassigned hour entries matched; {} remain unassigned",
            reconciled.matched,
            reconciled.unassigned,
            reconciled.unassigned - reconciled.matched
        ));
    } else if reconciled.unassigned > 0 {
        trail.info(format!(
            "All {} unassigned hour entries matched to imported tasks",
            reconciled.unassigned
        ));
    }

    let task_count = plan.tasks.len();
    Ok(ImportOutcome {
        summary: ImportSummary {
            units_saved: replaced.units_saved,
            phases_saved: replaced.phases_saved,
            tasks_saved: replaced.tasks_saved,
            deps_saved: replaced.deps_saved,
            unassigned_hours: reconciled.unassigned,
            tasks_matched: reconciled.matched,
        },
        task_count,
        tasks: plan.tasks,
    })
}

async fn replace_schedule(
    state: &AppState,
    request: &ImportRequest,
    plan: &ConvertedPlan,
    dependencies: &[Row],
    document_id: &str,
    trail: &mut DiagnosticTrail,
) -> ImportResult<crate::db::replace::ReplaceOutcome> {
    let tx = ReplaceTransaction::begin(
        &state.db,
        &request.project_id,
        state.config.upsert_batch_size,
    )
    .await
    .map_err(ImportError::Transaction)?;

    tx.execute(plan, dependencies, document_id, trail)
        .await
        .map_err(ImportError::Transaction)
}

/// Total-task count from the parser's summary block, naming varies
fn parsed_task_total(payload: &Value) -> Option<u64> {
    let summary = payload.get("summary")?;
    ["totalTasks", "total_tasks", "totalRows", "total_rows"]
        .iter()
        .find_map(|key| summary.get(*key).and_then(Value::as_u64))
}
