//! Schedule import endpoint
//!
//! POST /api/schedule/import accepts a multipart form naming the
//! uploaded document and the target project. The response always
//! carries the import's log lines and diagnostic trail, success or not.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::diagnostics::DiagnosticTrail;
use crate::error::ImportError;
use crate::services::import_pipeline::{run_import, ImportOutcome, ImportRequest};
use crate::AppState;

pub fn import_routes() -> Router<AppState> {
    Router::new().route("/api/schedule/import", post(import_schedule))
}

/// POST /api/schedule/import
async fn import_schedule(State(state): State<AppState>, multipart: Multipart) -> Response {
    let mut trail = DiagnosticTrail::new();

    let request = match read_request(multipart).await {
        Ok(request) => request,
        Err(e) => return failure_response(e, trail),
    };

    tracing::info!(
        document_id = %request.document_id,
        project_id = %request.project_id,
        "Schedule import requested"
    );

    match run_import(&state, request, &mut trail).await {
        Ok(outcome) => success_response(outcome, trail),
        Err(e) => failure_response(e, trail),
    }
}

/// Extract and validate the multipart form fields
///
/// Validation failures report before any store access.
async fn read_request(mut multipart: Multipart) -> Result<ImportRequest, ImportError> {
    let mut request = ImportRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ImportError::Validation(format!("malformed multipart request: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| ImportError::Validation(format!("unreadable field '{}': {}", name, e)))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }

        match name.as_str() {
            "documentId" | "document_id" => request.document_id = value,
            "projectId" | "project_id" => request.project_id = value,
            "portfolioId" | "portfolio_id" => request.portfolio_id = Some(value),
            "customerId" | "customer_id" => request.customer_id = Some(value),
            "siteId" | "site_id" => request.site_id = Some(value),
            "storagePath" | "storage_path" => request.storage_path = Some(value),
            _ => {}
        }
    }

    if request.document_id.is_empty() {
        return Err(ImportError::Validation("documentId is required".to_string()));
    }
    if request.project_id.is_empty() {
        return Err(ImportError::Validation("projectId is required".to_string()));
    }

    Ok(request)
}

fn success_response(outcome: ImportOutcome, trail: DiagnosticTrail) -> Response {
    let (logs, diagnostics) = trail.into_parts();
    let body = json!({
        "success": true,
        "logs": logs,
        "diagnostics": diagnostics,
        "summary": outcome.summary,
        "taskCount": outcome.task_count,
        "tasks": outcome.tasks,
    });
    (StatusCode::OK, Json(body)).into_response()
}

fn failure_response(error: ImportError, trail: DiagnosticTrail) -> Response {
    let status = error.status_code();
    let (_, diagnostics) = trail.into_parts();
    let body = json!({
        "success": false,
        "error": error.to_string(),
        "diagnostics": diagnostics,
    });
    (status, Json(body)).into_response()
}
