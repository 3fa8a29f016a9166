//! Parser payload normalization
//!
//! Turns the parsing service's plan payload into canonical unit, phase
//! and task records stamped with the import's hierarchy context. The
//! upstream service has changed field naming several times over its
//! life, so every field is resolved through an ordered fallback list of
//! accessor names rather than ad hoc lookups at each call site.

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ConvertedPlan, ImportContext, Row};

/// How much offending payload to attach to a conversion failure
const ERROR_SAMPLE_LEN: usize = 256;

/// Structurally invalid parser payload
#[derive(Debug, Error)]
#[error("{message} (payload sample: {sample})")]
pub struct ConversionError {
    pub message: String,
    /// Truncated rendering of the offending input
    pub sample: String,
}

impl ConversionError {
    fn new(message: impl Into<String>, offending: &Value) -> Self {
        Self {
            message: message.into(),
            sample: sample_of(offending),
        }
    }
}

/// Render a truncated sample of a payload fragment for diagnostics
fn sample_of(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.len() <= ERROR_SAMPLE_LEN {
        return rendered;
    }
    let mut end = ERROR_SAMPLE_LEN;
    while !rendered.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &rendered[..end])
}

// Fallback accessor orders. camelCase first (current wire form), then
// snake_case, then legacy names still seen from older parser versions.
const TASKS_KEYS: &[&str] = &["tasks", "task_list", "activities"];
const UNITS_KEYS: &[&str] = &["units", "wbs_units", "wbsUnits"];
const PHASES_KEYS: &[&str] = &["phases", "wbs_phases", "wbsPhases"];

const ID_KEYS: &[&str] = &["id", "uid", "uniqueId", "unique_id"];
const TASK_ID_KEYS: &[&str] = &["id", "taskId", "task_id", "uid", "uniqueId", "unique_id"];
const NAME_KEYS: &[&str] = &["name", "taskName", "task_name", "title"];
const UNIT_ID_KEYS: &[&str] = &["unitId", "unit_id"];
const UNIT_NAME_KEYS: &[&str] = &["unitName", "unit_name"];
const PHASE_ID_KEYS: &[&str] = &["phaseId", "phase_id"];
const PHASE_NAME_KEYS: &[&str] = &["phaseName", "phase_name"];

const BASELINE_START_KEYS: &[&str] = &[
    "baselineStart",
    "baseline_start",
    "plannedStart",
    "planned_start",
];
const BASELINE_END_KEYS: &[&str] = &[
    "baselineEnd",
    "baseline_end",
    "plannedFinish",
    "planned_finish",
];
const ACTUAL_START_KEYS: &[&str] = &["actualStart", "actual_start"];
const ACTUAL_END_KEYS: &[&str] = &["actualEnd", "actual_end", "actualFinish", "actual_finish"];
const BASELINE_HOURS_KEYS: &[&str] = &[
    "baselineHours",
    "baseline_hours",
    "budgetHours",
    "budget_hours",
];
const ACTUAL_HOURS_KEYS: &[&str] = &["actualHours", "actual_hours"];
const BASELINE_COST_KEYS: &[&str] = &["baselineCost", "baseline_cost", "budgetCost", "budget_cost"];
const ACTUAL_COST_KEYS: &[&str] = &["actualCost", "actual_cost"];
const PERCENT_COMPLETE_KEYS: &[&str] = &[
    "percentComplete",
    "percent_complete",
    "pctComplete",
    "pct_complete",
];
const COMMENTS_KEYS: &[&str] = &["comments", "comment", "notes"];
const PREDECESSORS_KEYS: &[&str] = &["predecessors", "predecessorList", "predecessor_list"];
const SUCCESSORS_KEYS: &[&str] = &["successors", "successorList", "successor_list"];
const CREATED_AT_KEYS: &[&str] = &["createdAt", "created_at"];

/// First value present under any of the candidate names
fn pick<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| {
        obj.get(*name)
            .filter(|value| !value.is_null())
    })
}

/// First candidate that resolves to a non-empty string; numbers are
/// accepted and rendered, since older parser versions emit numeric ids
fn pick_str(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match pick(obj, names)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First candidate that resolves to a number; numeric strings parse too
fn pick_number(obj: &Map<String, Value>, names: &[&str]) -> Option<f64> {
    match pick(obj, names)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Normalize the parser payload into canonical plan records
///
/// A structurally invalid payload (not an object, no tasks array) fails
/// with a [`ConversionError`] carrying a sample of the offending input.
/// The store is never touched here.
pub fn convert(payload: &Value, ctx: &ImportContext) -> Result<ConvertedPlan, ConversionError> {
    let root = payload
        .as_object()
        .ok_or_else(|| ConversionError::new("parser payload is not a JSON object", payload))?;

    let task_values = pick(root, TASKS_KEYS)
        .and_then(Value::as_array)
        .ok_or_else(|| ConversionError::new("parser payload has no tasks array", payload))?;

    let mut plan = ConvertedPlan::default();

    for value in task_values {
        if let Some(obj) = value.as_object() {
            plan.tasks.push(convert_task(obj, ctx));
        }
    }

    match pick(root, UNITS_KEYS).and_then(Value::as_array) {
        Some(values) => {
            for value in values {
                if let Some(obj) = value.as_object() {
                    plan.units.push(convert_unit(obj, ctx));
                }
            }
        }
        // Flat documents come back without WBS arrays; rebuild the unit
        // list from the ids the tasks reference
        None => plan.units = derive_group(&plan.tasks, "unitId", "unitName", ctx),
    }

    match pick(root, PHASES_KEYS).and_then(Value::as_array) {
        Some(values) => {
            for value in values {
                if let Some(obj) = value.as_object() {
                    plan.phases.push(convert_phase(obj, ctx));
                }
            }
        }
        None => plan.phases = derive_group(&plan.tasks, "phaseId", "phaseName", ctx),
    }

    Ok(plan)
}

/// Shared WBS fields: identity, naming, dates, effort, cost, progress
fn convert_common(obj: &Map<String, Value>, id_keys: &[&str], ctx: &ImportContext) -> Row {
    let now = Utc::now().to_rfc3339();
    let mut row = Row::new();

    if let Some(id) = pick_str(obj, id_keys) {
        row.insert("id".into(), Value::String(id));
    }
    if let Some(name) = pick_str(obj, NAME_KEYS) {
        row.insert("name".into(), Value::String(name));
    }

    for (key, names) in [
        ("baselineStart", BASELINE_START_KEYS),
        ("baselineEnd", BASELINE_END_KEYS),
        ("actualStart", ACTUAL_START_KEYS),
        ("actualEnd", ACTUAL_END_KEYS),
        ("comments", COMMENTS_KEYS),
    ] {
        if let Some(text) = pick_str(obj, names) {
            row.insert(key.into(), Value::String(text));
        }
    }

    for (key, names) in [
        ("baselineHours", BASELINE_HOURS_KEYS),
        ("actualHours", ACTUAL_HOURS_KEYS),
        ("baselineCost", BASELINE_COST_KEYS),
        ("actualCost", ACTUAL_COST_KEYS),
        ("percentComplete", PERCENT_COMPLETE_KEYS),
    ] {
        if let Some(number) = pick_number(obj, names) {
            row.insert(key.into(), Value::from(number));
        }
    }

    // Hierarchy context supplied with the import wins over payload values
    row.insert("projectId".into(), Value::String(ctx.project_id.clone()));
    for (key, value) in [
        ("portfolioId", &ctx.portfolio_id),
        ("customerId", &ctx.customer_id),
        ("siteId", &ctx.site_id),
    ] {
        if let Some(value) = value {
            row.insert(key.into(), Value::String(value.clone()));
        }
    }

    let created_at = pick_str(obj, CREATED_AT_KEYS).unwrap_or_else(|| now.clone());
    row.insert("createdAt".into(), Value::String(created_at));
    row.insert("updatedAt".into(), Value::String(now));

    row
}

fn convert_unit(obj: &Map<String, Value>, ctx: &ImportContext) -> Row {
    let mut row = convert_common(obj, ID_KEYS, ctx);
    if !row.contains_key("name") {
        if let Some(name) = pick_str(obj, UNIT_NAME_KEYS) {
            row.insert("name".into(), Value::String(name));
        }
    }
    row
}

fn convert_phase(obj: &Map<String, Value>, ctx: &ImportContext) -> Row {
    let mut row = convert_common(obj, ID_KEYS, ctx);
    if !row.contains_key("name") {
        if let Some(name) = pick_str(obj, PHASE_NAME_KEYS) {
            row.insert("name".into(), Value::String(name));
        }
    }
    if let Some(unit_id) = pick_str(obj, UNIT_ID_KEYS) {
        row.insert("unitId".into(), Value::String(unit_id));
    }
    row
}

fn convert_task(obj: &Map<String, Value>, ctx: &ImportContext) -> Row {
    let mut row = convert_common(obj, TASK_ID_KEYS, ctx);

    for (key, names) in [
        ("unitId", UNIT_ID_KEYS),
        ("phaseId", PHASE_ID_KEYS),
        ("phaseName", PHASE_NAME_KEYS),
    ] {
        if let Some(text) = pick_str(obj, names) {
            row.insert(key.into(), Value::String(text));
        }
    }

    // Raw reference lists ride along untouched; the dependency builder
    // extracts edges and the store keeps them JSON-encoded
    for (key, names) in [
        ("predecessors", PREDECESSORS_KEYS),
        ("successors", SUCCESSORS_KEYS),
    ] {
        if let Some(value) = pick(obj, names) {
            row.insert(key.into(), value.clone());
        }
    }

    row
}

/// Rebuild a grouping level (units or phases) from task references
fn derive_group(tasks: &[Row], id_key: &str, name_key: &str, ctx: &ImportContext) -> Vec<Row> {
    let now = Utc::now().to_rfc3339();
    let mut seen = std::collections::BTreeMap::new();

    for task in tasks {
        let Some(Value::String(id)) = task.get(id_key) else {
            continue;
        };
        let name = match task.get(name_key) {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        };
        seen.entry(id.clone()).or_insert(name);
    }

    seen.into_iter()
        .map(|(id, name)| {
            let mut row = Row::new();
            row.insert("id".into(), Value::String(id));
            if let Some(name) = name {
                row.insert("name".into(), Value::String(name));
            }
            row.insert("projectId".into(), Value::String(ctx.project_id.clone()));
            row.insert("createdAt".into(), Value::String(now.clone()));
            row.insert("updatedAt".into(), Value::String(now.clone()));
            row
        })
        .collect()
}
