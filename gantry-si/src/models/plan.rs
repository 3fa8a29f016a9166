//! Canonical plan records produced by conversion
//!
//! Converted records travel as JSON objects with camelCase keys, the
//! same form the import response echoes back. The live storage column
//! set varies across deployments, so the upsert engine decides
//! per-column what actually persists.

use serde::Serialize;
use serde_json::Value;

/// One canonical record: a JSON object with camelCase keys
pub type Row = serde_json::Map<String, Value>;

/// Hierarchy context stamped onto every converted record
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub project_id: String,
    pub portfolio_id: Option<String>,
    pub customer_id: Option<String>,
    pub site_id: Option<String>,
}

impl ImportContext {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }
}

/// Work-breakdown structure produced by the plan converter
#[derive(Debug, Clone, Default)]
pub struct ConvertedPlan {
    pub units: Vec<Row>,
    pub phases: Vec<Row>,
    pub tasks: Vec<Row>,
}

/// Row counts reported by a completed import
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub units_saved: usize,
    pub phases_saved: usize,
    pub tasks_saved: usize,
    pub deps_saved: usize,
    pub unassigned_hours: usize,
    pub tasks_matched: usize,
}

/// Read a string field off a row, treating empty strings as absent
pub fn row_str<'a>(row: &'a Row, key: &str) -> Option<&'a str> {
    match row.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serializes_camel_case() {
        let summary = ImportSummary {
            tasks_saved: 12,
            ..Default::default()
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["tasksSaved"], 12);
        assert_eq!(json["unassignedHours"], 0);
    }

    #[test]
    fn row_str_skips_empty_and_non_string() {
        let mut row = Row::new();
        row.insert("name".into(), Value::String("Excavate".into()));
        row.insert("empty".into(), Value::String(String::new()));
        row.insert("num".into(), Value::from(3));

        assert_eq!(row_str(&row, "name"), Some("Excavate"));
        assert_eq!(row_str(&row, "empty"), None);
        assert_eq!(row_str(&row, "num"), None);
        assert_eq!(row_str(&row, "missing"), None);
    }
}
