//! Row loading for the diff engine (§4.7 "Ambient addition — row loading").
//!
//! Both sides of a diff are read through the same `duckdb` connection used
//! by the query engine, via `read_parquet(...)`, but consumed one row at a
//! time through duckdb's row-value API rather than Arrow — the diff
//! algorithm wants scalar comparisons, not vectorized batches.

use std::collections::BTreeMap;

use duckdb::types::Value;
use duckdb::Connection;

use super::errors::{DiffError, DiffResult};
use super::key::RowKey;

/// One row, keyed for identity comparison and holding every other column
/// for the value-level diff.
#[derive(Debug, Clone)]
pub struct RowRecord {
    pub key: String,
    pub values: BTreeMap<String, Value>,
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::TinyInt(n) => n.to_string(),
        Value::SmallInt(n) => n.to_string(),
        Value::Int(n) => n.to_string(),
        Value::BigInt(n) => n.to_string(),
        Value::HugeInt(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Double(n) => n.to_string(),
        Value::Text(s) => s.clone(),
        other => format!("{other:?}"),
    }
}

/// Build the `SELECT` that loads one snapshot's rows, pre-sorted by the
/// identity key so the external-merge path can walk it lockstep with the
/// other side.
fn select_sql(data_path: &str, columns: &[String], key: &RowKey, sorted: bool) -> String {
    let column_list = columns
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(", ");

    let key_expr = match key {
        RowKey::Fingerprint(cols) => {
            let concatenated = cols
                .iter()
                .map(|c| format!("COALESCE(CAST(\"{}\" AS VARCHAR), '')", c.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(" || '\\x1f' || ");
            format!("sha256(({concatenated}))")
        }
        RowKey::LiteralId => "CAST(\"id\" AS VARCHAR)".to_string(),
        RowKey::Declared(cols) => cols
            .iter()
            .map(|c| format!("CAST(\"{}\" AS VARCHAR)", c.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(" || '\\x1f' || "),
    };

    let order_clause = if sorted { " ORDER BY _snapbase_key" } else { "" };
    format!(
        "SELECT {key_expr} AS _snapbase_key, {column_list} FROM read_parquet('{path}'){order_clause}",
        path = data_path.replace('\'', "''"),
    )
}

/// Load every row of one snapshot, sorted ascending by the identity key.
/// Used by the external-merge path (§4.7 step 3): sorting is delegated to
/// duckdb, which spills to disk past its own memory threshold, rather than
/// the engine holding every row in a Rust hash map.
pub fn load_sorted_rows(
    conn: &Connection,
    data_path: &str,
    columns: &[String],
    key: &RowKey,
) -> DiffResult<Vec<RowRecord>> {
    load_rows(conn, data_path, columns, key, true)
}

/// Load every row of one snapshot in storage order. Used by the hash-map
/// path for workloads under the streaming threshold, where materializing a
/// `HashMap` is cheaper than paying for a sort that's about to be thrown
/// away.
pub fn load_unsorted_rows(
    conn: &Connection,
    data_path: &str,
    columns: &[String],
    key: &RowKey,
) -> DiffResult<Vec<RowRecord>> {
    load_rows(conn, data_path, columns, key, false)
}

fn load_rows(
    conn: &Connection,
    data_path: &str,
    columns: &[String],
    key: &RowKey,
    sorted: bool,
) -> DiffResult<Vec<RowRecord>> {
    let sql = select_sql(data_path, columns, key, sorted);
    let mut stmt = conn.prepare(&sql).map_err(|e| DiffError::Engine(e.to_string()))?;
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .skip(1) // _snapbase_key
        .collect();

    let rows = stmt
        .query_map([], move |row| {
            let key_value: String = row.get::<_, String>(0)?;
            let mut values = BTreeMap::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: Value = row.get(i + 1)?;
                values.insert(name.clone(), value);
            }
            Ok(RowRecord { key: key_value, values })
        })
        .map_err(|e| DiffError::Engine(e.to_string()))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row.map_err(|e| DiffError::Engine(e.to_string()))?);
    }
    Ok(records)
}

pub fn render(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::TinyInt(n) => serde_json::json!(n),
        Value::SmallInt(n) => serde_json::json!(n),
        Value::Int(n) => serde_json::json!(n),
        Value::BigInt(n) => serde_json::json!(n),
        Value::HugeInt(n) => serde_json::Value::String(n.to_string()),
        Value::Float(n) => serde_json::json!(n),
        Value::Double(n) => serde_json::json!(n),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        other => serde_json::Value::String(value_to_text(other)),
    }
}
