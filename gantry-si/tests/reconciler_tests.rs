//! Hour-entry reconciliation against a live database

use serde_json::{json, Value};
use sqlx::SqlitePool;

use gantry_si::models::Row;
use gantry_si::services::reconciler::reconcile_hours;

fn task(id: &str, name: &str, phase: &str) -> Row {
    let mut row = Row::new();
    row.insert("id".into(), Value::String(id.into()));
    row.insert("name".into(), Value::String(name.into()));
    row.insert("phaseName".into(), Value::String(phase.into()));
    row
}

async fn seeded_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    gantry_common::db::schema::initialize_schema(&pool)
        .await
        .unwrap();

    sqlx::query(
        r#"
        INSERT INTO hour_entries (id, project_id, task_id, phase_label, task_label, hours) VALUES
            ('H1', 'proj-1', NULL, 'Civil ',  'Excavate A',   8.0),
            ('H2', 'proj-1', '',   'CIVIL',   'pour   slab',  4.0),
            ('H3', 'proj-1', NULL, 'Unknown', 'Nothing Like', 2.0),
            ('H4', 'proj-1', 'T9', 'Civil',   'Excavate A',   1.0)
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

#[tokio::test]
async fn matches_link_entries_and_misses_stay_unassigned() {
    let pool = seeded_pool().await;
    let tasks = vec![
        task("T1", "Excavate A", "Civil"),
        task("T2", "Pour Slab", "Civil"),
    ];

    let outcome = reconcile_hours(&pool, "proj-1", &tasks).await.unwrap();
    assert_eq!(outcome.unassigned, 3);
    assert_eq!(outcome.matched, 2);

    let linked: Vec<(String, Option<String>)> =
        sqlx::query_as("SELECT id, task_id FROM hour_entries WHERE project_id = 'proj-1' ORDER BY id")
            .fetch_all(&pool)
            .await
            .unwrap();

    assert_eq!(linked[0], ("H1".into(), Some("T1".into())));
    assert_eq!(linked[1], ("H2".into(), Some("T2".into())));
    // The miss is left untouched, not failed
    assert_eq!(linked[2].1, None);
    // Entries already linked are not candidates
    assert_eq!(linked[3].1, Some("T9".into()));
}

#[tokio::test]
async fn no_unassigned_entries_is_a_clean_zero() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    gantry_common::db::schema::initialize_schema(&pool)
        .await
        .unwrap();

    let outcome = reconcile_hours(&pool, "proj-1", &[task("T1", "Excavate A", "Civil")])
        .await
        .unwrap();
    assert_eq!(outcome.unassigned, 0);
    assert_eq!(outcome.matched, 0);
}

#[tokio::test]
async fn reconciliation_scopes_to_the_project() {
    let pool = seeded_pool().await;
    sqlx::query(
        "INSERT INTO hour_entries (id, project_id, task_id, phase_label, task_label, hours)
         VALUES ('H-other', 'proj-2', NULL, 'Civil', 'Excavate A', 3.0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    reconcile_hours(&pool, "proj-1", &[task("T1", "Excavate A", "Civil")])
        .await
        .unwrap();

    let other: Option<String> =
        sqlx::query_scalar("SELECT task_id FROM hour_entries WHERE id = 'H-other'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(other, None);
}

#[tokio::test]
async fn json_payload_shaped_tasks_match_like_the_import_does() {
    // Tasks exactly as the converter emits them, JSON lists included
    let pool = seeded_pool().await;
    let mut t1 = task("T1", "Excavate A", "Civil");
    t1.insert("predecessors".into(), json!([]));

    let outcome = reconcile_hours(&pool, "proj-1", &[t1]).await.unwrap();
    assert_eq!(outcome.matched, 1);
}
