//! Query engine (§4.6).
//!
//! Executes SQL against the full history of a source as if it were one
//! table, via an embedded `duckdb` connection. Every snapshot of the
//! source is unioned into a temp view with injected `snapshot_name` and
//! `snapshot_sequence` columns; the view IS a `duckdb` construct, built
//! fresh per call, matching the spec's per-operation execution model.

mod errors;

pub use errors::{QueryError, QueryResult};

use arrow::record_batch::RecordBatch as ArrowRecordBatch;

use crate::catalog::{Catalog, CatalogEntry};
use crate::snapshot::{self, SnapshotMeta};
use crate::source::{ColumnType, Schema};
use crate::storage::StorageBackend;

/// Replace every character that isn't `[A-Za-z0-9_]` with `_`, and strip a
/// trailing extension — e.g. `customer_data.csv` -> `customer_data_csv`.
pub fn sanitize_identifier(raw: &str) -> String {
    let stem = std::path::Path::new(raw)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(raw);
    let ext = std::path::Path::new(raw).extension().and_then(|e| e.to_str());
    let joined = match ext {
        Some(ext) => format!("{stem}_{ext}"),
        None => stem.to_string(),
    };
    joined
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

pub struct QueryRequest<'a> {
    pub source: &'a str,
    pub sql: &'a str,
    pub limit: Option<u64>,
    pub strict: bool,
}

pub struct QueryOutcome {
    pub batches: Vec<ArrowRecordBatch>,
}

pub fn query(
    backend: &dyn StorageBackend,
    catalog: &Catalog,
    request: QueryRequest<'_>,
) -> QueryResult<QueryOutcome> {
    let entries = catalog.list_snapshots_for_source(backend, request.source)?;
    if entries.is_empty() {
        return Err(QueryError::TableNotFound(request.source.to_string()));
    }

    reconcile_schemas(backend, &entries)?;

    let view_name = sanitize_identifier(request.source);
    let conn = duckdb::Connection::open_in_memory().map_err(|e| QueryError::Engine(e.to_string()))?;

    let view_sql = build_view_sql(backend, &view_name, &entries)?;
    conn.execute_batch(&view_sql).map_err(|e| QueryError::Engine(e.to_string()))?;

    let mut sql = request.sql.trim().trim_end_matches(';').to_string();
    if let Some(limit) = request.limit {
        sql = format!("SELECT * FROM ({sql}) AS _snapbase_limited LIMIT {limit}");
    }

    let mut stmt = conn.prepare(&sql).map_err(|e| QueryError::SqlParseError(e.to_string()))?;
    let arrow_result = stmt
        .query_arrow([])
        .map_err(|e| QueryError::Engine(e.to_string()))?;
    let batches: Vec<ArrowRecordBatch> = arrow_result.collect();

    if request.strict && batches.iter().all(|b| b.num_rows() == 0) {
        return Err(QueryError::EmptyResult);
    }

    Ok(QueryOutcome { batches })
}

fn build_view_sql(
    backend: &dyn StorageBackend,
    view_name: &str,
    entries: &[CatalogEntry],
) -> QueryResult<String> {
    let mut branches = Vec::with_capacity(entries.len());
    for entry in entries {
        let data_key = snapshot::data_key(&entry.source_key, &entry.name);
        let path = backend
            .local_path(&data_key)
            .ok_or_else(|| QueryError::Engine("backend has no filesystem path for duckdb".to_string()))?;
        let escaped_path = path.to_string_lossy().replace('\'', "''");
        let escaped_name = entry.name.replace('\'', "''");
        branches.push(format!(
            "SELECT *, '{escaped_name}' AS snapshot_name, {seq} AS snapshot_sequence FROM read_parquet('{escaped_path}')",
            seq = entry.sequence,
        ));
    }

    let union = branches.join("\nUNION ALL BY NAME\n");
    Ok(format!("CREATE OR REPLACE TEMP VIEW {view_name} AS\n{union};"))
}

fn load_meta(backend: &dyn StorageBackend, source_key: &str, name: &str) -> QueryResult<SnapshotMeta> {
    let key = snapshot::meta_key(source_key, name);
    let bytes = backend.get_blob(&key)?;
    serde_json::from_slice(&bytes).map_err(|e| QueryError::Engine(e.to_string()))
}

/// Pairs that may widen to something other than `String` without losing
/// information: identical types, or the two numeric types narrowing to
/// `Float64`. Every other mismatch can only be reconciled by falling back
/// to `String`, which is the boundary the spec calls "no safe widening".
fn is_safe_widen(a: ColumnType, b: ColumnType) -> bool {
    a == b || matches!((a, b), (ColumnType::Int64, ColumnType::Float64) | (ColumnType::Float64, ColumnType::Int64))
}

/// Union every snapshot's schema (§4.6): for each column name, the narrowest
/// common type across all snapshots that carry it. A mismatch outside
/// `is_safe_widen` can only be reconciled by widening to `String`, which is
/// the spec's documented fallback for int64-vs-string-style conflicts — but
/// a mismatch where neither side is already `String` has no such lossless
/// fallback and is surfaced as `ColumnTypeConflict` instead of silently
/// coercing to a type that can't hold both sides' values.
fn reconcile_schemas(backend: &dyn StorageBackend, entries: &[CatalogEntry]) -> QueryResult<Schema> {
    let mut union_schema = Schema::new();
    for entry in entries {
        let meta = load_meta(backend, &entry.source_key, &entry.name)?;
        for col in meta.schema.iter() {
            match union_schema.get(&col.name) {
                Some(existing) if existing.column_type != col.column_type => {
                    let safe = is_safe_widen(existing.column_type, col.column_type)
                        || existing.column_type == ColumnType::String
                        || col.column_type == ColumnType::String;
                    if !safe {
                        return Err(QueryError::ColumnTypeConflict {
                            column: col.name.clone(),
                            types: vec![existing.column_type.label().to_string(), col.column_type.label().to_string()],
                        });
                    }
                }
                _ => {}
            }
        }
        union_schema = union_schema.union(&meta.schema);
    }
    Ok(union_schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ColumnDef;
    use crate::storage::LocalBackend;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn sanitizes_punctuation_and_keeps_extension_as_suffix() {
        assert_eq!(sanitize_identifier("customer_data.csv"), "customer_data_csv");
        assert_eq!(sanitize_identifier("orders-2024.ndjson"), "orders_2024_ndjson");
    }

    fn schema_with(columns: &[(&str, ColumnType)]) -> Schema {
        let mut schema = Schema::new();
        for (name, column_type) in columns {
            schema.push(ColumnDef { name: (*name).to_string(), column_type: *column_type, nullable: false });
        }
        schema
    }

    fn write_meta(backend: &LocalBackend, source_key: &str, name: &str, schema: Schema) {
        let meta = SnapshotMeta {
            name: name.to_string(),
            source: "orders".to_string(),
            source_path: "orders.csv".to_string(),
            format: "csv".to_string(),
            sequence: 1,
            row_count: 1,
            column_count: schema.len() as u64,
            schema,
            content_hash: "deadbeef".to_string(),
            created_at: Utc::now(),
        };
        let bytes = serde_json::to_vec_pretty(&meta).unwrap();
        backend.put_blob(&snapshot::meta_key(source_key, name), &bytes).unwrap();
    }

    fn entry(source_key: &str, name: &str, sequence: u64) -> CatalogEntry {
        CatalogEntry {
            source: "orders".to_string(),
            source_key: source_key.to_string(),
            name: name.to_string(),
            sequence,
            content_hash: "deadbeef".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn reconciles_numeric_widening_across_snapshots() {
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        write_meta(&backend, "src1", "v1", schema_with(&[("id", ColumnType::Int64), ("amount", ColumnType::Int64)]));
        write_meta(&backend, "src1", "v2", schema_with(&[("id", ColumnType::Int64), ("amount", ColumnType::Float64)]));
        let entries = vec![entry("src1", "v1", 1), entry("src1", "v2", 2)];

        let union_schema = reconcile_schemas(&backend, &entries).unwrap();
        assert_eq!(union_schema.get("amount").unwrap().column_type, ColumnType::Float64);
    }

    #[test]
    fn irreconcilable_type_mismatch_is_a_typed_conflict() {
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        write_meta(&backend, "src1", "v1", schema_with(&[("active", ColumnType::Bool)]));
        write_meta(&backend, "src1", "v2", schema_with(&[("active", ColumnType::Int64)]));
        let entries = vec![entry("src1", "v1", 1), entry("src1", "v2", 2)];

        let result = reconcile_schemas(&backend, &entries);
        assert!(matches!(result, Err(QueryError::ColumnTypeConflict { column, .. }) if column == "active"));
    }
}
