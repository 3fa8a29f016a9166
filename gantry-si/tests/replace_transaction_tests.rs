//! Transactional replace controller tests

use serde_json::{json, Value};
use sqlx::SqlitePool;

use gantry_si::db::replace::ReplaceTransaction;
use gantry_si::diagnostics::DiagnosticTrail;
use gantry_si::models::{ConvertedPlan, Row};
use gantry_si::services::dependency_builder::build_dependencies;

fn row(pairs: &[(&str, Value)]) -> Row {
    let mut row = Row::new();
    for (key, value) in pairs {
        row.insert(key.to_string(), value.clone());
    }
    row
}

/// Schema, one project, two cataloged documents, one old schedule generation
async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    gantry_common::db::schema::initialize_schema(&pool)
        .await
        .unwrap();

    sqlx::query("INSERT INTO projects (id, name) VALUES ('proj-1', 'Refinery Expansion')")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO schedule_documents (id, project_id, file_name, storage_path, is_current_version) VALUES
            ('doc-old', 'proj-1', 'plan_v1.mpp', 'proj-1/plan_v1.mpp', 1),
            ('doc-new', 'proj-1', 'plan_v2.mpp', 'proj-1/plan_v2.mpp', 0)
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    // Previous generation
    sqlx::query("INSERT INTO units (id, project_id, name) VALUES ('U-old', 'proj-1', 'Old Unit')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO phases (id, project_id, name) VALUES ('P-old', 'proj-1', 'Old Phase')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO tasks (id, project_id, name) VALUES ('T-old', 'proj-1', 'Old Task')")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO dependencies (id, project_id, predecessor_task_id, successor_task_id)
         VALUES ('D-old', 'proj-1', 'T-old', 'T-old2')",
    )
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO project_logs (id, project_id, message) VALUES ('L-old', 'proj-1', 'old import')",
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

fn new_generation() -> (ConvertedPlan, Vec<Row>) {
    let tasks = vec![
        row(&[
            ("id", json!("T1")),
            ("projectId", json!("proj-1")),
            ("name", json!("Excavate A")),
            ("successors", json!([{"taskId": "T2", "type": "FS", "lag": 0}])),
        ]),
        row(&[
            ("id", json!("T2")),
            ("projectId", json!("proj-1")),
            ("name", json!("Pour Slab")),
        ]),
    ];
    let built = build_dependencies(&tasks, "proj-1");

    let plan = ConvertedPlan {
        units: vec![row(&[
            ("id", json!("U1")),
            ("projectId", json!("proj-1")),
            ("name", json!("North Plant")),
        ])],
        phases: vec![row(&[
            ("id", json!("P1")),
            ("projectId", json!("proj-1")),
            ("name", json!("Civil")),
        ])],
        tasks,
    };
    (plan, built.rows)
}

async fn count(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

#[tokio::test]
async fn replace_swaps_the_entire_generation() {
    let pool = seeded_pool().await;
    let (plan, deps) = new_generation();
    let mut trail = DiagnosticTrail::new();

    let tx = ReplaceTransaction::begin(&pool, "proj-1", 200).await.unwrap();
    let outcome = tx.execute(&plan, &deps, "doc-new", &mut trail).await.unwrap();

    assert_eq!(outcome.units_saved, 1);
    assert_eq!(outcome.phases_saved, 1);
    assert_eq!(outcome.tasks_saved, 2);
    assert_eq!(outcome.deps_saved, 1);

    // Old generation is gone, new one is in
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM units WHERE id = 'U-old'").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM tasks WHERE id = 'T-old'").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM dependencies WHERE id = 'D-old'").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM project_logs").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM tasks").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM dependencies").await, 1);

    // Project flagged, document currency flipped
    assert_eq!(
        count(&pool, "SELECT has_schedule FROM projects WHERE id = 'proj-1'").await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT is_current_version FROM schedule_documents WHERE id = 'doc-new'").await,
        1
    );
    assert_eq!(
        count(&pool, "SELECT is_current_version FROM schedule_documents WHERE id = 'doc-old'").await,
        0
    );
}

#[tokio::test]
async fn failure_mid_replace_rolls_back_everything() {
    let pool = seeded_pool().await;
    let (plan, deps) = new_generation();
    let mut trail = DiagnosticTrail::new();

    // Force the task upsert to fail after deletes and the unit/phase
    // upserts have already been issued
    sqlx::query(
        "CREATE TRIGGER block_task_insert BEFORE INSERT ON tasks
         BEGIN SELECT RAISE(ABORT, 'induced task failure'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let tx = ReplaceTransaction::begin(&pool, "proj-1", 200).await.unwrap();
    let result = tx.execute(&plan, &deps, "doc-new", &mut trail).await;
    assert!(result.is_err());

    // Nothing from the new generation is visible
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM units WHERE id = 'U1'").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM phases WHERE id = 'P1'").await, 0);

    // The old generation survived the rollback
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM units WHERE id = 'U-old'").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM phases WHERE id = 'P-old'").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM project_logs").await, 1);
    assert_eq!(
        count(&pool, "SELECT has_schedule FROM projects WHERE id = 'proj-1'").await,
        0
    );
    assert_eq!(
        count(&pool, "SELECT is_current_version FROM schedule_documents WHERE id = 'doc-old'").await,
        1
    );
}

#[tokio::test]
async fn importing_the_same_payload_twice_is_idempotent() {
    let pool = seeded_pool().await;
    let mut trail = DiagnosticTrail::new();

    let (plan, deps) = new_generation();
    let tx = ReplaceTransaction::begin(&pool, "proj-1", 200).await.unwrap();
    let first = tx.execute(&plan, &deps, "doc-new", &mut trail).await.unwrap();

    let first_dep_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM dependencies ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();

    // Same parser payload, fresh conversion, second import
    let (plan, deps) = new_generation();
    let tx = ReplaceTransaction::begin(&pool, "proj-1", 200).await.unwrap();
    let second = tx.execute(&plan, &deps, "doc-new", &mut trail).await.unwrap();

    assert_eq!(first.tasks_saved, second.tasks_saved);
    assert_eq!(first.deps_saved, second.deps_saved);

    let second_dep_ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM dependencies ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();
    assert_eq!(first_dep_ids, second_dep_ids);

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM tasks").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM dependencies").await, 1);
}
