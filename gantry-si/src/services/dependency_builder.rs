//! Task dependency graph derivation
//!
//! Dependencies are always derived from the imported tasks' raw
//! predecessor/successor reference lists, never hand-edited. Edge
//! identity is computed from the edge itself, so rebuilding the graph
//! from the same payload yields the same ids and the same row count.

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

use crate::models::plan::row_str;
use crate::models::Row;

/// Recognized relationship types; anything else coerces to FS
const RELATIONSHIP_TYPES: [&str; 4] = ["FS", "SS", "FF", "SF"];

/// Aggregate counts for the diagnostic trail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyStats {
    pub emitted: usize,
    pub self_loops_dropped: usize,
    pub missing_endpoint_dropped: usize,
    pub duplicates_dropped: usize,
}

/// Derived dependency rows plus drop accounting
#[derive(Debug, Default)]
pub struct BuiltDependencies {
    pub rows: Vec<Row>,
    pub stats: DependencyStats,
}

/// One reference entry parsed out of a task's raw list
struct EdgeRef {
    task_id: String,
    relationship: String,
    lag_days: f64,
}

/// Derive the deduplicated directed edge set for one import batch
///
/// Every edge must connect two tasks present in this batch; self-loops
/// and dangling references are dropped and counted, never persisted.
pub fn build_dependencies(tasks: &[Row], project_id: &str) -> BuiltDependencies {
    let task_ids: HashSet<&str> = tasks.iter().filter_map(|t| row_str(t, "id")).collect();

    let mut edges: BTreeMap<String, Row> = BTreeMap::new();
    let mut stats = DependencyStats::default();
    let now = Utc::now().to_rfc3339();

    for task in tasks {
        let Some(task_id) = row_str(task, "id") else {
            continue;
        };

        for entry in reference_entries(task.get("predecessors")) {
            let predecessor = entry.task_id.clone();
            record_edge(
                &predecessor,
                task_id,
                entry,
                &task_ids,
                project_id,
                &now,
                &mut edges,
                &mut stats,
            );
        }
        for entry in reference_entries(task.get("successors")) {
            let successor = entry.task_id.clone();
            record_edge(
                task_id,
                &successor,
                entry,
                &task_ids,
                project_id,
                &now,
                &mut edges,
                &mut stats,
            );
        }
    }

    stats.emitted = edges.len();
    BuiltDependencies {
        rows: edges.into_values().collect(),
        stats,
    }
}

#[allow(clippy::too_many_arguments)]
fn record_edge(
    predecessor: &str,
    successor: &str,
    entry: EdgeRef,
    task_ids: &HashSet<&str>,
    project_id: &str,
    now: &str,
    edges: &mut BTreeMap<String, Row>,
    stats: &mut DependencyStats,
) {
    if predecessor == successor {
        stats.self_loops_dropped += 1;
        return;
    }
    if !task_ids.contains(predecessor) || !task_ids.contains(successor) {
        stats.missing_endpoint_dropped += 1;
        return;
    }

    let id = dependency_id(predecessor, successor, &entry.relationship, entry.lag_days);
    if edges.contains_key(&id) {
        stats.duplicates_dropped += 1;
        return;
    }

    let mut row = Row::new();
    row.insert("id".into(), Value::String(id.clone()));
    row.insert("projectId".into(), Value::String(project_id.to_string()));
    row.insert(
        "predecessorTaskId".into(),
        Value::String(predecessor.to_string()),
    );
    row.insert(
        "successorTaskId".into(),
        Value::String(successor.to_string()),
    );
    row.insert(
        "relationshipType".into(),
        Value::String(entry.relationship),
    );
    row.insert("lagDays".into(), Value::from(entry.lag_days));
    row.insert("createdAt".into(), Value::String(now.to_string()));
    row.insert("updatedAt".into(), Value::String(now.to_string()));

    edges.insert(id, row);
}

/// Parse a raw predecessor/successor list into reference entries
///
/// Entries are objects carrying an id plus optional relationship and
/// lag; bare string ids are accepted from older parser versions.
fn reference_entries(raw: Option<&Value>) -> Vec<EdgeRef> {
    let Some(Value::Array(entries)) = raw else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(id) if !id.trim().is_empty() => Some(EdgeRef {
                task_id: id.trim().to_string(),
                relationship: "FS".to_string(),
                lag_days: 0.0,
            }),
            Value::Object(obj) => {
                let task_id = ["taskId", "task_id", "id"]
                    .iter()
                    .find_map(|key| match obj.get(*key) {
                        Some(Value::String(s)) if !s.trim().is_empty() => {
                            Some(s.trim().to_string())
                        }
                        Some(Value::Number(n)) => Some(n.to_string()),
                        _ => None,
                    })?;
                Some(EdgeRef {
                    task_id,
                    relationship: coerce_relationship(
                        ["type", "relationship", "relationshipType", "relationship_type"]
                            .iter()
                            .find_map(|key| obj.get(*key).and_then(Value::as_str)),
                    ),
                    lag_days: coerce_lag(
                        ["lag", "lagDays", "lag_days"]
                            .iter()
                            .find_map(|key| obj.get(*key)),
                    ),
                })
            }
            _ => None,
        })
        .collect()
}

/// Coerce a relationship label to one of FS/SS/FF/SF, defaulting to FS
fn coerce_relationship(label: Option<&str>) -> String {
    let upper = label.unwrap_or("FS").trim().to_uppercase();
    if RELATIONSHIP_TYPES.contains(&upper.as_str()) {
        upper
    } else {
        "FS".to_string()
    }
}

/// Coerce a lag value to days, defaulting to 0
fn coerce_lag(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Deterministic edge id derived from the four-tuple
pub fn dependency_id(predecessor: &str, successor: &str, relationship: &str, lag_days: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(predecessor.as_bytes());
    hasher.update(b"|");
    hasher.update(successor.as_bytes());
    hasher.update(b"|");
    hasher.update(relationship.as_bytes());
    hasher.update(b"|");
    hasher.update(format!("{}", lag_days).as_bytes());

    let digest = hasher.finalize();
    let mut id = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        id.push_str(&format!("{:02x}", byte));
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic_over_the_four_tuple() {
        let a = dependency_id("T1", "T2", "FS", 2.0);
        let b = dependency_id("T1", "T2", "FS", 2.0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        // Any component change moves the id
        assert_ne!(a, dependency_id("T2", "T1", "FS", 2.0));
        assert_ne!(a, dependency_id("T1", "T2", "SS", 2.0));
        assert_ne!(a, dependency_id("T1", "T2", "FS", 3.0));
    }

    #[test]
    fn relationship_coercion_defaults_to_fs() {
        assert_eq!(coerce_relationship(Some("ss")), "SS");
        assert_eq!(coerce_relationship(Some("FF")), "FF");
        assert_eq!(coerce_relationship(Some("START-TO-START")), "FS");
        assert_eq!(coerce_relationship(None), "FS");
    }

    #[test]
    fn lag_coercion_defaults_to_zero() {
        assert_eq!(coerce_lag(Some(&Value::from(3.5))), 3.5);
        assert_eq!(coerce_lag(Some(&Value::String("4".into()))), 4.0);
        assert_eq!(coerce_lag(Some(&Value::String("soon".into()))), 0.0);
        assert_eq!(coerce_lag(None), 0.0);
    }
}
