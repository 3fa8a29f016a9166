//! Schema-aware batch upsert engine
//!
//! Deployments of the suite do not all carry the same columns: sites
//! add bespoke columns out-of-band and older databases lag behind.
//! Nothing here assumes a compiled column list. The live column set is
//! discovered once per table per operation, candidate rows are filtered
//! down to what the table can actually hold, and what survives is
//! written in fixed-size multi-row upsert statements.

use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::models::Row;
use gantry_common::db::schema::table_columns;

/// One storage-ready row: snake_case column → value
type StorageRow = BTreeMap<String, Value>;

/// Tuning for one table's upserts
#[derive(Debug, Clone)]
pub struct UpsertOptions {
    /// Rows per statement; bounds statement size
    pub batch_size: usize,
    /// Identifier fields tried, in order, when a row has no `id`
    pub id_fallbacks: &'static [&'static str],
    /// Columns that hold JSON-encoded lists; never bound as NULL
    pub json_list_columns: &'static [&'static str],
}

impl Default for UpsertOptions {
    fn default() -> Self {
        Self {
            batch_size: 200,
            id_fallbacks: &[],
            json_list_columns: &[],
        }
    }
}

/// Aggregate counts for one upsert operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Rows that reached a persisted state
    pub persisted: usize,
    /// Rows discarded for want of an identifier
    pub discarded: usize,
}

/// Upserter for one table, bound to its live column set
///
/// [`TableUpsert::prepare`] runs the single introspection query; the
/// returned value is used for every batch of the surrounding operation
/// so call sites never re-discover mid-transaction.
pub struct TableUpsert {
    table: String,
    columns: HashSet<String>,
    options: UpsertOptions,
}

impl TableUpsert {
    /// Discover the table's live columns and build an upserter
    pub async fn prepare(
        conn: &mut SqliteConnection,
        table: &str,
        options: UpsertOptions,
    ) -> anyhow::Result<Self> {
        let columns = table_columns(&mut *conn, table).await?;
        anyhow::ensure!(!columns.is_empty(), "table '{}' does not exist", table);

        Ok(Self {
            table: table.to_string(),
            columns: columns.into_iter().collect(),
            options,
        })
    }

    /// Upsert a list of candidate rows
    ///
    /// Rows are written sequentially in [`UpsertOptions::batch_size`]
    /// chunks, one multi-row statement per chunk. A failed statement
    /// propagates; the caller's transaction owns atomicity.
    pub async fn upsert_rows(
        &self,
        conn: &mut SqliteConnection,
        rows: &[Row],
    ) -> anyhow::Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();

        let mut prepared: Vec<StorageRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match self.prepare_row(row) {
                Some(storage_row) => prepared.push(storage_row),
                None => outcome.discarded += 1,
            }
        }

        if prepared.is_empty() {
            return Ok(outcome);
        }

        // Column union across the whole batch, identifier always present
        let mut columns: BTreeSet<String> = BTreeSet::new();
        columns.insert("id".to_string());
        for storage_row in &prepared {
            columns.extend(storage_row.keys().cloned());
        }

        for chunk in prepared.chunks(self.options.batch_size.max(1)) {
            self.execute_batch(conn, &columns, chunk).await?;
            outcome.persisted += chunk.len();
        }

        tracing::debug!(
            table = %self.table,
            persisted = outcome.persisted,
            discarded = outcome.discarded,
            "Upsert batch complete"
        );

        Ok(outcome)
    }

    /// Filter one candidate row down to storable columns
    ///
    /// Returns None when no identifier can be resolved. Such rows are
    /// discarded, not an error; callers see the count in the outcome.
    fn prepare_row(&self, row: &Row) -> Option<StorageRow> {
        let id = self.resolve_identifier(row)?;

        let mut storage_row = StorageRow::new();
        storage_row.insert("id".to_string(), Value::String(id));

        for (field, value) in row {
            let column = to_snake_case(field);
            if column == "id" || !self.columns.contains(&column) {
                continue;
            }
            if self.is_json_list(&column) {
                storage_row.insert(column, Value::String(encode_json_list(value)));
            } else if !value.is_null() {
                storage_row.insert(column, value.clone());
            }
        }

        Some(storage_row)
    }

    /// Primary `id`, then the domain-specific fallback chain
    fn resolve_identifier(&self, row: &Row) -> Option<String> {
        std::iter::once("id")
            .chain(self.options.id_fallbacks.iter().copied())
            .find_map(|field| match row.get(field) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }

    fn is_json_list(&self, column: &str) -> bool {
        self.options.json_list_columns.contains(&column)
    }

    /// One multi-row INSERT ... ON CONFLICT statement for a chunk
    async fn execute_batch(
        &self,
        conn: &mut SqliteConnection,
        columns: &BTreeSet<String>,
        chunk: &[StorageRow],
    ) -> anyhow::Result<()> {
        let column_list: Vec<&str> = columns.iter().map(String::as_str).collect();

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("INSERT INTO ");
        builder.push(&self.table);
        builder.push(" (");
        for (i, column) in column_list.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push(*column);
        }
        builder.push(") ");

        builder.push_values(chunk, |mut values, storage_row| {
            for column in &column_list {
                match storage_row.get(*column) {
                    Some(Value::String(s)) => values.push_bind(s.clone()),
                    Some(Value::Number(n)) if n.is_i64() => {
                        values.push_bind(n.as_i64().unwrap_or_default())
                    }
                    Some(Value::Number(n)) => {
                        values.push_bind(n.as_f64().unwrap_or_default())
                    }
                    Some(Value::Bool(b)) => values.push_bind(*b as i64),
                    Some(other @ (Value::Array(_) | Value::Object(_))) => {
                        values.push_bind(other.to_string())
                    }
                    // A column another row contributed: JSON lists get
                    // their empty form, scalars bind NULL
                    _ if self.is_json_list(column) => values.push_bind("[]".to_string()),
                    _ => values.push_bind(None::<String>),
                };
            }
        });

        if column_list.len() == 1 {
            // Identifier-only rows carry nothing to update
            builder.push(" ON CONFLICT(id) DO NOTHING");
        } else {
            builder.push(" ON CONFLICT(id) DO UPDATE SET ");
            let mut first = true;
            for column in &column_list {
                if *column == "id" {
                    continue;
                }
                if !first {
                    builder.push(", ");
                }
                first = false;
                builder.push(*column);
                builder.push(" = excluded.");
                builder.push(*column);
            }
        }

        builder.build().execute(&mut *conn).await?;
        Ok(())
    }
}

/// Map a camelCase field name to its snake_case storage key
pub fn to_snake_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for ch in field.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Serialize an array/object value for a JSON-list column
///
/// Null, scalar, and unparseable values become the empty list rather
/// than NULL, which some deployments constrain against.
fn encode_json_list(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_string(),
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(_)) | Ok(Value::Object(_)) => s.clone(),
            _ => "[]".to_string(),
        },
        _ => "[]".to_string(),
    }
}
