//! Hour-entry reconciliation
//!
//! After a successful schedule replace, time-tracking entries that were
//! never linked to a task get another chance: their free-text phase and
//! task labels are matched against the freshly imported task list. A
//! miss is expected and non-fatal; only the aggregate counts surface.

use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::models::plan::row_str;
use crate::models::Row;

/// Reconciliation counts returned to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Entries that were unassigned when reconciliation started
    pub unassigned: usize,
    /// Entries linked to an imported task
    pub matched: usize,
}

/// One unassigned time-tracking entry
#[derive(Debug, Clone)]
pub struct UnassignedEntry {
    pub id: String,
    pub phase_label: String,
    pub task_label: String,
}

/// Normalize a label for matching: lowercase, punctuation and
/// whitespace runs collapse to single spaces, trimmed
pub fn normalize_label(label: &str) -> String {
    let mut normalized = String::with_capacity(label.len());
    let mut pending_space = false;

    for ch in label.chars() {
        if ch.is_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
        } else {
            pending_space = true;
        }
    }

    normalized
}

/// Match unassigned entries against the imported task list
///
/// Tasks index twice: a composite `phase|name` key, and a name-only
/// fallback that keeps the first task seen so a later duplicate name
/// cannot overwrite the more specific entry. Returns `(entry_id,
/// task_id)` pairs.
pub fn match_entries(entries: &[UnassignedEntry], tasks: &[Row]) -> Vec<(String, String)> {
    let mut by_phase_and_name: HashMap<String, &str> = HashMap::new();
    let mut by_name: HashMap<String, &str> = HashMap::new();

    for task in tasks {
        let Some(task_id) = row_str(task, "id") else {
            continue;
        };
        let name = normalize_label(row_str(task, "name").unwrap_or_default());
        if name.is_empty() {
            continue;
        }
        let phase = normalize_label(row_str(task, "phaseName").unwrap_or_default());

        by_phase_and_name
            .entry(format!("{}|{}", phase, name))
            .or_insert(task_id);
        by_name.entry(name).or_insert(task_id);
    }

    entries
        .iter()
        .filter_map(|entry| {
            let name = normalize_label(&entry.task_label);
            if name.is_empty() {
                return None;
            }
            let phase = normalize_label(&entry.phase_label);

            let composite = format!("{}|{}", phase, name);
            by_phase_and_name
                .get(&composite)
                .or_else(|| by_name.get(&name))
                .map(|task_id| (entry.id.clone(), task_id.to_string()))
        })
        .collect()
}

/// Load the project's unassigned hour entries and link every one whose
/// labels match an imported task
pub async fn reconcile_hours(
    pool: &SqlitePool,
    project_id: &str,
    tasks: &[Row],
) -> anyhow::Result<ReconcileOutcome> {
    let entries = crate::db::hours::load_unassigned(pool, project_id).await?;
    let outcome_unassigned = entries.len();

    let matches = match_entries(&entries, tasks);
    let mut matched = 0usize;

    for (entry_id, task_id) in &matches {
        crate::db::hours::assign_task(pool, entry_id, task_id).await?;
        matched += 1;
    }

    let outcome = ReconcileOutcome {
        unassigned: outcome_unassigned,
        matched,
    };

    if outcome.unassigned > outcome.matched {
        tracing::warn!(
            project_id,
            unassigned = outcome.unassigned,
            matched = outcome.matched,
            "Hour entries left unassigned after reconciliation"
        );
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn task(id: &str, name: &str, phase: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::String(id.into()));
        row.insert("name".into(), Value::String(name.into()));
        row.insert("phaseName".into(), Value::String(phase.into()));
        row
    }

    fn entry(id: &str, phase: &str, name: &str) -> UnassignedEntry {
        UnassignedEntry {
            id: id.into(),
            phase_label: phase.into(),
            task_label: name.into(),
        }
    }

    #[test]
    fn normalization_collapses_case_space_and_punctuation() {
        assert_eq!(normalize_label("  Excavate   A "), "excavate a");
        assert_eq!(normalize_label("EXCAVATE--A"), "excavate a");
        assert_eq!(normalize_label("Pour (slab) #2"), "pour slab 2");
        assert_eq!(normalize_label("***"), "");
    }

    #[test]
    fn composite_key_matches_despite_label_noise() {
        let tasks = vec![task("T1", "Excavate A", "Civil")];
        let entries = vec![entry("H1", "Civil ", "excavate  a")];

        let matches = match_entries(&entries, &tasks);
        assert_eq!(matches, vec![("H1".to_string(), "T1".to_string())]);
    }

    #[test]
    fn falls_back_to_name_only_on_phase_miss() {
        let tasks = vec![task("T1", "Excavate A", "Civil")];
        let entries = vec![entry("H1", "Totally Wrong Phase", "Excavate A")];

        let matches = match_entries(&entries, &tasks);
        assert_eq!(matches, vec![("H1".to_string(), "T1".to_string())]);
    }

    #[test]
    fn name_fallback_keeps_first_task_seen() {
        let tasks = vec![
            task("T1", "Inspect", "Civil"),
            task("T2", "Inspect", "Electrical"),
        ];
        // Phase matches the second task: composite lookup wins
        let composite = match_entries(&[entry("H1", "Electrical", "Inspect")], &tasks);
        assert_eq!(composite[0].1, "T2");

        // No phase match: fallback resolves to the first indexed task
        let fallback = match_entries(&[entry("H2", "", "Inspect")], &tasks);
        assert_eq!(fallback[0].1, "T1");
    }

    #[test]
    fn unmatched_and_blank_entries_are_skipped() {
        let tasks = vec![task("T1", "Excavate A", "Civil")];
        let entries = vec![entry("H1", "Civil", "Unknown Work"), entry("H2", "", "  ")];

        assert!(match_entries(&entries, &tasks).is_empty());
    }
}
