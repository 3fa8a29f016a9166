//! Schedule document lookup
//!
//! Documents are uploaded and cataloged elsewhere in the suite; the
//! import pipeline only resolves them (by id, with a storage-path
//! fallback for older clients) and, inside the replace transaction,
//! flips the current-version flag.

use anyhow::Result;
use sqlx::{Row as _, SqlitePool};

/// One cataloged schedule document
#[derive(Debug, Clone)]
pub struct ScheduleDocument {
    pub id: String,
    pub project_id: String,
    pub file_name: String,
    pub storage_path: String,
    pub doc_type: String,
    pub is_current_version: bool,
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> ScheduleDocument {
    ScheduleDocument {
        id: row.get("id"),
        project_id: row.get("project_id"),
        file_name: row.get("file_name"),
        storage_path: row.get("storage_path"),
        doc_type: row.get("doc_type"),
        is_current_version: row.get::<i64, _>("is_current_version") != 0,
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, project_id, file_name, storage_path, doc_type, is_current_version";

/// Resolve a document by id, then by storage path when supplied
pub async fn find_document(
    pool: &SqlitePool,
    document_id: &str,
    fallback_storage_path: Option<&str>,
) -> Result<Option<ScheduleDocument>> {
    let query = format!(
        "SELECT {} FROM schedule_documents WHERE id = ?",
        DOCUMENT_COLUMNS
    );
    if let Some(row) = sqlx::query(&query)
        .bind(document_id)
        .fetch_optional(pool)
        .await?
    {
        return Ok(Some(document_from_row(&row)));
    }

    let Some(storage_path) = fallback_storage_path else {
        return Ok(None);
    };

    let query = format!(
        "SELECT {} FROM schedule_documents WHERE storage_path = ?",
        DOCUMENT_COLUMNS
    );
    let row = sqlx::query(&query)
        .bind(storage_path)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| document_from_row(&row)))
}
