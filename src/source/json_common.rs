//! Shared JSON-object-to-`RecordBatch` conversion, used by both the
//! newline-delimited reader and the whole-document array reader (§4.3).
//!
//! Schema is the union of keys seen across the first 1024 records. A record
//! seen afterward that introduces a key outside that union is schema drift
//! and rejects the whole read, rather than silently widening mid-stream.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::errors::{SourceError, SourceResult};
use super::schema::{ColumnData, ColumnDef, ColumnType, RecordBatch, Schema, DEFAULT_ROW_BATCH_SIZE};

pub(super) const SCHEMA_SAMPLE_SIZE: usize = 1024;

pub(super) fn build_schema(
    path: &Path,
    records: &[serde_json::Map<String, JsonValue>],
) -> SourceResult<Schema> {
    let mut key_order: Vec<String> = Vec::new();
    let mut types: IndexMap<String, ColumnType> = IndexMap::new();

    for record in records.iter().take(SCHEMA_SAMPLE_SIZE) {
        for (key, value) in record {
            if !types.contains_key(key) {
                key_order.push(key.clone());
                types.insert(key.clone(), json_type(value));
            } else if let Some(existing) = types.get(key).copied() {
                types.insert(key.clone(), existing.widen(json_type(value)));
            }
        }
    }

    for (position, record) in records.iter().enumerate().skip(SCHEMA_SAMPLE_SIZE) {
        let unseen: Vec<String> = record
            .keys()
            .filter(|k| !types.contains_key(*k))
            .cloned()
            .collect();
        if !unseen.is_empty() {
            return Err(SourceError::SchemaDrift {
                path: path.to_path_buf(),
                line: position + 1,
                columns: unseen,
                sampled: SCHEMA_SAMPLE_SIZE,
            });
        }
    }

    let columns = key_order
        .into_iter()
        .map(|name| {
            let column_type = types[&name];
            ColumnDef { name, column_type, nullable: true }
        })
        .collect();
    Ok(Schema::from_columns(columns))
}

fn json_type(value: &JsonValue) -> ColumnType {
    match value {
        JsonValue::Bool(_) => ColumnType::Bool,
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Int64,
        JsonValue::Number(_) => ColumnType::Float64,
        JsonValue::String(s) => {
            if chrono::DateTime::parse_from_rfc3339(s).is_ok() {
                ColumnType::Timestamp
            } else {
                ColumnType::String
            }
        }
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => ColumnType::String,
    }
}

pub(super) fn build_batches(
    schema: &Schema,
    records: &[serde_json::Map<String, JsonValue>],
) -> SourceResult<Vec<RecordBatch>> {
    let mut batches = Vec::new();
    let mut columns = blank_columns(schema);
    let mut rows_in_batch = 0usize;

    for record in records {
        for col in schema.iter() {
            push_value(
                columns.get_mut(&col.name).expect("columns from schema"),
                record.get(&col.name),
                col.column_type,
            );
        }
        rows_in_batch += 1;
        if rows_in_batch >= DEFAULT_ROW_BATCH_SIZE {
            batches.push(RecordBatch::new(schema.clone(), std::mem::replace(&mut columns, blank_columns(schema))));
            rows_in_batch = 0;
        }
    }

    if rows_in_batch > 0 || batches.is_empty() {
        batches.push(RecordBatch::new(schema.clone(), columns));
    }
    Ok(batches)
}

fn blank_columns(schema: &Schema) -> IndexMap<String, ColumnData> {
    schema
        .iter()
        .map(|col| {
            let data = match col.column_type {
                ColumnType::Int64 => ColumnData::Int64(Vec::new()),
                ColumnType::Float64 => ColumnData::Float64(Vec::new()),
                ColumnType::Bool => ColumnData::Bool(Vec::new()),
                ColumnType::Timestamp => ColumnData::Timestamp(Vec::new()),
                ColumnType::String => ColumnData::String(Vec::new()),
            };
            (col.name.clone(), data)
        })
        .collect()
}

fn push_value(column: &mut ColumnData, value: Option<&JsonValue>, column_type: ColumnType) {
    match (column, value, column_type) {
        (ColumnData::Int64(v), Some(JsonValue::Number(n)), _) => v.push(n.as_i64()),
        (ColumnData::Int64(v), _, _) => v.push(None),
        (ColumnData::Float64(v), Some(JsonValue::Number(n)), _) => v.push(n.as_f64()),
        (ColumnData::Float64(v), _, _) => v.push(None),
        (ColumnData::Bool(v), Some(JsonValue::Bool(b)), _) => v.push(Some(*b)),
        (ColumnData::Bool(v), _, _) => v.push(None),
        (ColumnData::Timestamp(v), Some(JsonValue::String(s)), _) => {
            v.push(chrono::DateTime::parse_from_rfc3339(s).ok().map(|d| d.timestamp()))
        }
        (ColumnData::Timestamp(v), _, _) => v.push(None),
        (ColumnData::String(v), Some(JsonValue::String(s)), _) => v.push(Some(s.clone())),
        (ColumnData::String(v), Some(other), _) => v.push(Some(other.to_string())),
        (ColumnData::String(v), None, _) => v.push(None),
    }
}
