//! Dependency graph builder scenarios

use serde_json::{json, Value};

use gantry_si::models::Row;
use gantry_si::services::dependency_builder::build_dependencies;

fn task(id: &str, predecessors: Value, successors: Value) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), Value::String(id.into()));
    if !predecessors.is_null() {
        row.insert("predecessors".into(), predecessors);
    }
    if !successors.is_null() {
        row.insert("successors".into(), successors);
    }
    row
}

#[test]
fn no_references_yields_empty_graph() {
    let tasks = vec![
        task("T1", Value::Null, Value::Null),
        task("T2", Value::Null, Value::Null),
    ];

    let built = build_dependencies(&tasks, "proj-1");
    assert!(built.rows.is_empty());
    assert_eq!(built.stats.emitted, 0);
}

#[test]
fn predecessor_and_successor_references_both_emit_edges() {
    let tasks = vec![
        task("T1", Value::Null, json!([{"taskId": "T2", "type": "SS", "lag": 1}])),
        task("T2", Value::Null, Value::Null),
        task("T3", json!([{"taskId": "T2"}]), Value::Null),
    ];

    let built = build_dependencies(&tasks, "proj-1");
    assert_eq!(built.rows.len(), 2);

    let find = |pred: &str, succ: &str| {
        built.rows.iter().find(|row| {
            row["predecessorTaskId"] == pred && row["successorTaskId"] == succ
        })
    };

    let forward = find("T1", "T2").expect("successor edge");
    assert_eq!(forward["relationshipType"], "SS");
    assert_eq!(forward["lagDays"], 1.0);
    assert_eq!(forward["projectId"], "proj-1");

    let backward = find("T2", "T3").expect("predecessor edge");
    assert_eq!(backward["relationshipType"], "FS");
    assert_eq!(backward["lagDays"], 0.0);
}

#[test]
fn self_loop_is_rejected() {
    let tasks = vec![task("T1", json!([{"taskId": "T1"}]), Value::Null)];

    let built = build_dependencies(&tasks, "proj-1");
    assert!(built.rows.is_empty());
    assert_eq!(built.stats.self_loops_dropped, 1);
}

#[test]
fn edge_to_task_outside_batch_is_dropped() {
    let tasks = vec![task(
        "T1",
        json!([{"taskId": "NOT-IMPORTED"}]),
        json!([{"taskId": "ALSO-MISSING"}]),
    )];

    let built = build_dependencies(&tasks, "proj-1");
    assert!(built.rows.is_empty());
    assert_eq!(built.stats.missing_endpoint_dropped, 2);
}

#[test]
fn duplicate_edges_collapse_to_one_row() {
    // T1 names T2 as successor AND T2 names T1 as predecessor: the same
    // four-tuple from both sides
    let tasks = vec![
        task("T1", Value::Null, json!([{"taskId": "T2", "type": "FS", "lag": 0}])),
        task("T2", json!([{"taskId": "T1", "type": "FS", "lag": 0}]), Value::Null),
    ];

    let built = build_dependencies(&tasks, "proj-1");
    assert_eq!(built.rows.len(), 1);
    assert_eq!(built.stats.duplicates_dropped, 1);
}

#[test]
fn rerun_on_identical_input_is_idempotent() {
    let tasks = vec![
        task("T1", Value::Null, json!([{"taskId": "T2", "type": "FF", "lag": 3}])),
        task("T2", json!([{"taskId": "T3", "type": "SF"}]), Value::Null),
        task("T3", Value::Null, Value::Null),
    ];

    let first = build_dependencies(&tasks, "proj-1");
    let second = build_dependencies(&tasks, "proj-1");

    let ids = |built: &gantry_si::services::dependency_builder::BuiltDependencies| {
        built
            .rows
            .iter()
            .map(|row| row["id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(first.rows.len(), second.rows.len());
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn unrecognized_relationship_defaults_to_fs() {
    let tasks = vec![
        task("T1", Value::Null, json!([{"taskId": "T2", "type": "FINISH-WHENEVER"}])),
        task("T2", Value::Null, Value::Null),
    ];

    let built = build_dependencies(&tasks, "proj-1");
    assert_eq!(built.rows[0]["relationshipType"], "FS");
}

#[test]
fn bare_string_references_are_accepted() {
    let tasks = vec![
        task("T1", json!(["T2"]), Value::Null),
        task("T2", Value::Null, Value::Null),
    ];

    let built = build_dependencies(&tasks, "proj-1");
    assert_eq!(built.rows.len(), 1);
    assert_eq!(built.rows[0]["predecessorTaskId"], "T2");
    assert_eq!(built.rows[0]["successorTaskId"], "T1");
}
