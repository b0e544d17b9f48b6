//! Snapshot diff engine (§4.7).
//!
//! Compares two committed snapshots of the same source column-by-column and
//! row-by-row. Row loading goes through `duckdb` so the same `read_parquet`
//! path used by the query engine backs both the hash-map and external-merge
//! comparison modes.

mod algorithm;
mod errors;
mod key;
mod row_source;

pub use algorithm::{ModifiedRow, RowDiff, ValueChange, STREAMING_THRESHOLD};
pub use errors::{DiffError, DiffResult};
pub use key::{resolve_key, RowKey};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::snapshot::{self, SnapshotMeta};
use crate::source::{self, Schema};
use crate::storage::StorageBackend;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaChange {
    ColumnAdded { column: String, column_type: String },
    ColumnRemoved { column: String, column_type: String },
    TypeChanged { column: String, from: String, to: String },
}

#[derive(Debug, Serialize)]
pub struct DiffSummary {
    pub rows_added: u64,
    pub rows_removed: u64,
    pub rows_modified: u64,
}

#[derive(Debug, Serialize)]
pub struct DiffOutcome {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedRow>,
    pub schema_changes: Vec<SchemaChange>,
    pub summary: DiffSummary,
}

fn type_label(t: crate::source::ColumnType) -> String {
    format!("{t:?}").to_lowercase()
}

/// Columns present in one schema but not the other, or present in both with
/// a different type (§4.7 step 1, "schema changes are computed independently
/// of row changes").
fn compute_schema_changes(from: &Schema, to: &Schema) -> Vec<SchemaChange> {
    let mut changes = Vec::new();
    for col in from.iter() {
        match to.get(&col.name) {
            None => changes.push(SchemaChange::ColumnRemoved {
                column: col.name.clone(),
                column_type: type_label(col.column_type),
            }),
            Some(other) if other.column_type != col.column_type => changes.push(SchemaChange::TypeChanged {
                column: col.name.clone(),
                from: type_label(col.column_type),
                to: type_label(other.column_type),
            }),
            Some(_) => {}
        }
    }
    for col in to.iter() {
        if from.get(&col.name).is_none() {
            changes.push(SchemaChange::ColumnAdded {
                column: col.name.clone(),
                column_type: type_label(col.column_type),
            });
        }
    }
    changes
}

fn load_meta(backend: &dyn StorageBackend, source_key: &str, name: &str) -> DiffResult<SnapshotMeta> {
    let key = snapshot::meta_key(source_key, name);
    let bytes = backend.get_blob(&key)?;
    serde_json::from_slice(&bytes).map_err(|e| DiffError::Engine(e.to_string()))
}

/// Run the row comparison, choosing the hash-map or external-merge path by
/// row count (§4.7 step 3).
fn compare_rows(
    conn: &duckdb::Connection,
    from_path: &str,
    to_path: &str,
    from_rows: u64,
    to_rows: u64,
    key: &RowKey,
) -> DiffResult<RowDiff> {
    let columns: Vec<String> = key
        .columns()
        .iter()
        .cloned()
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let fingerprint_mode = key.is_fingerprint();
    let common_columns: Vec<String> = columns.clone();

    if from_rows.max(to_rows) as usize > STREAMING_THRESHOLD {
        let from_rows = row_source::load_sorted_rows(conn, from_path, &common_columns, key)?;
        let to_rows = row_source::load_sorted_rows(conn, to_path, &common_columns, key)?;
        Ok(algorithm::merge_diff(from_rows, to_rows, &common_columns, fingerprint_mode))
    } else {
        let from_rows = row_source::load_unsorted_rows(conn, from_path, &common_columns, key)?;
        let to_rows = row_source::load_unsorted_rows(conn, to_path, &common_columns, key)?;
        Ok(algorithm::hash_map_diff(from_rows, to_rows, &common_columns, fingerprint_mode))
    }
}

fn build_outcome(schema_changes: Vec<SchemaChange>, rows: RowDiff) -> DiffOutcome {
    let summary = DiffSummary {
        rows_added: rows.added.len() as u64,
        rows_removed: rows.removed.len() as u64,
        rows_modified: rows.modified.len() as u64,
    };
    DiffOutcome {
        added: rows.added,
        removed: rows.removed,
        modified: rows.modified,
        schema_changes,
        summary,
    }
}

/// Compare two committed snapshots of `source` (§4.7).
pub fn diff(
    backend: &dyn StorageBackend,
    catalog: &Catalog,
    source: &str,
    from_snapshot: &str,
    to_snapshot: &str,
    declared_pk: Option<&[String]>,
) -> DiffResult<DiffOutcome> {
    let from_entry = catalog.resolve(backend, from_snapshot, Some(source))?;
    let to_entry = catalog.resolve(backend, to_snapshot, Some(source))?;

    let from_meta = load_meta(backend, &from_entry.source_key, &from_entry.name)?;
    let to_meta = load_meta(backend, &to_entry.source_key, &to_entry.name)?;

    let schema_changes = compute_schema_changes(&from_meta.schema, &to_meta.schema);
    let key = resolve_key(declared_pk, &from_meta.schema, &to_meta.schema);

    let from_data_key = snapshot::data_key(&from_entry.source_key, &from_entry.name);
    let to_data_key = snapshot::data_key(&to_entry.source_key, &to_entry.name);
    let from_path = backend
        .local_path(&from_data_key)
        .ok_or_else(|| DiffError::Engine("backend has no filesystem path for duckdb".to_string()))?;
    let to_path = backend
        .local_path(&to_data_key)
        .ok_or_else(|| DiffError::Engine("backend has no filesystem path for duckdb".to_string()))?;

    let conn = duckdb::Connection::open_in_memory().map_err(|e| DiffError::Engine(e.to_string()))?;
    let rows = compare_rows(
        &conn,
        &from_path.to_string_lossy(),
        &to_path.to_string_lossy(),
        from_meta.row_count,
        to_meta.row_count,
        &key,
    )?;

    Ok(build_outcome(schema_changes, rows))
}

/// Diff the current on-disk file against a committed baseline, without
/// creating a snapshot (§6 `status`/`detect_changes`).
pub fn detect_changes(
    backend: &dyn StorageBackend,
    catalog: &Catalog,
    source: &str,
    baseline_name: &str,
    live_path: &std::path::Path,
    declared_pk: Option<&[String]>,
) -> DiffResult<DiffOutcome> {
    let baseline_entry = catalog.resolve(backend, baseline_name, Some(source))?;
    let baseline_meta = load_meta(backend, &baseline_entry.source_key, &baseline_entry.name)?;

    let live_batches = source::read_source(live_path)?;
    let live_schema = source::merged_schema(&live_batches).unwrap_or_default();
    let live_row_count: u64 = live_batches.iter().map(|b| b.num_rows() as u64).sum();

    let schema_changes = compute_schema_changes(&baseline_meta.schema, &live_schema);
    let key = resolve_key(declared_pk, &baseline_meta.schema, &live_schema);

    let baseline_data_key = snapshot::data_key(&baseline_entry.source_key, &baseline_entry.name);
    let baseline_path = backend
        .local_path(&baseline_data_key)
        .ok_or_else(|| DiffError::Engine("backend has no filesystem path for duckdb".to_string()))?;

    // The live file has no snapshot payload to read via `read_parquet`, so
    // stage it under a scratch key the same way a commit would, using the
    // storage backend itself rather than a standalone temp directory.
    let scratch_key = format!("_scratch/detect/{}.parquet", baseline_entry.content_hash);
    let payload = source::write_parquet_bytes(&live_schema, &live_batches)?;
    backend.put_blob(&scratch_key, &payload)?;
    let scratch_path = backend
        .local_path(&scratch_key)
        .ok_or_else(|| DiffError::Engine("backend has no filesystem path for duckdb".to_string()))?;

    let conn = duckdb::Connection::open_in_memory().map_err(|e| DiffError::Engine(e.to_string()))?;
    let result = compare_rows(
        &conn,
        &baseline_path.to_string_lossy(),
        &scratch_path.to_string_lossy(),
        baseline_meta.row_count,
        live_row_count,
        &key,
    );

    backend.delete_prefix(&scratch_key).ok();
    let rows = result?;

    Ok(build_outcome(schema_changes, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{create_snapshot, CreateSnapshotRequest};
    use crate::storage::LocalBackend;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn diff_reports_added_removed_and_modified_rows() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());

        let v1 = write_file(temp.path(), "v1.csv", "id,name,amount\n1,Alice,10\n2,Bob,20\n");
        let v2 = write_file(temp.path(), "v2.csv", "id,name,amount\n1,Alice,99\n3,Carol,30\n");

        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "people".into(), source_path: v1, name_override: Some("v1".into()), default_name_pattern: "{source}_{seq}",
        }).unwrap();
        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "people".into(), source_path: v2, name_override: Some("v2".into()), default_name_pattern: "{source}_{seq}",
        }).unwrap();

        let catalog = Catalog::new();
        let outcome = diff(&backend, &catalog, "people", "v1", "v2", None).unwrap();

        assert_eq!(outcome.added, vec!["3".to_string()]);
        assert_eq!(outcome.removed, vec!["2".to_string()]);
        assert_eq!(outcome.modified.len(), 1);
        assert_eq!(outcome.modified[0].key, "1");
        assert_eq!(outcome.summary.rows_added, 1);
        assert_eq!(outcome.summary.rows_removed, 1);
        assert_eq!(outcome.summary.rows_modified, 1);
    }

    #[test]
    fn identical_snapshots_diff_empty() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());

        let path = write_file(temp.path(), "data.csv", "id,name\n1,Alice\n2,Bob\n");

        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "people".into(), source_path: path.clone(), name_override: Some("v1".into()), default_name_pattern: "{source}_{seq}",
        }).unwrap();
        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "people".into(), source_path: path, name_override: Some("v2".into()), default_name_pattern: "{source}_{seq}",
        }).unwrap();

        let catalog = Catalog::new();
        let outcome = diff(&backend, &catalog, "people", "v1", "v2", None).unwrap();
        assert!(outcome.added.is_empty());
        assert!(outcome.removed.is_empty());
        assert!(outcome.modified.is_empty());
    }
}
