//! Snapshot writer (§4.4).
//!
//! `create_snapshot` follows the exact sequence from §4.4: resolve the
//! final name, reject a duplicate, load the source, hash it, write the
//! source directory's `source.json` descriptor, write the columnar
//! payload, write `meta.json`, and atomically update `index.json`. The
//! workspace lock is held by the caller (the façade) for the whole
//! procedure; this module never acquires it itself.

use std::path::PathBuf;

use chrono::Utc;

use crate::source::{self, RecordBatch, Schema, SourceFormat};
use crate::storage::StorageBackend;

use super::errors::{SnapshotError, SnapshotResult};
use super::manifest::{
    content_hash, expand_name_pattern, source_key_hash, IndexEntry, IndexFile, SnapshotMeta, SourceDescriptor,
};

/// Data key prefix for one source's snapshots (§4.4 step 6).
pub fn source_prefix(source_key: &str) -> String {
    format!("sources/{source_key}")
}

fn index_key(source_key: &str) -> String {
    format!("{}/index.json", source_prefix(source_key))
}

fn source_descriptor_key(source_key: &str) -> String {
    format!("{}/source.json", source_prefix(source_key))
}

fn snapshot_dir(source_key: &str, name: &str) -> String {
    format!("{}/snapshots/{}", source_prefix(source_key), name)
}

pub fn data_key(source_key: &str, name: &str) -> String {
    format!("{}/data.columnar", snapshot_dir(source_key, name))
}

pub fn meta_key(source_key: &str, name: &str) -> String {
    format!("{}/meta.json", snapshot_dir(source_key, name))
}

pub fn load_index(backend: &dyn StorageBackend, source_key: &str) -> SnapshotResult<IndexFile> {
    let key = index_key(source_key);
    if !backend.exists(&key)? {
        return Ok(IndexFile::default());
    }
    let bytes = backend.get_blob(&key)?;
    serde_json::from_slice(&bytes).map_err(SnapshotError::from)
}

fn save_index(backend: &dyn StorageBackend, source_key: &str, index: &IndexFile) -> SnapshotResult<()> {
    let bytes = serde_json::to_vec_pretty(index)?;
    backend.put_blob(&index_key(source_key), &bytes).map_err(SnapshotError::from)
}

pub struct CreateSnapshotRequest<'a> {
    pub source_identifier: String,
    pub source_path: PathBuf,
    /// Lexically normalized, workspace-relative path used to derive
    /// `source_key` (§4.4 step 6) — kept distinct from `source_path` so two
    /// differently-spelled arguments for the same file hash identically.
    pub identity_path: PathBuf,
    pub name_override: Option<String>,
    pub default_name_pattern: &'a str,
}

pub struct CreateSnapshotOutcome {
    pub meta: SnapshotMeta,
}

/// Commit one snapshot. Caller holds the exclusive workspace lock.
pub fn create_snapshot(
    backend: &dyn StorageBackend,
    request: CreateSnapshotRequest<'_>,
) -> SnapshotResult<CreateSnapshotOutcome> {
    let normalized_source_path = request.source_path.to_string_lossy().to_string();
    let source_key = source_key_hash(&request.identity_path.to_string_lossy());

    let mut index = load_index(backend, &source_key)?;
    index.source = request.source_identifier.clone();

    let format = source::detect_format(&request.source_path)
        .map_err(SnapshotError::from)?;
    let seq = index.next_sequence();
    let now = Utc::now();

    let name = match request.name_override {
        Some(n) => n,
        None => expand_name_pattern(
            request.default_name_pattern,
            &request.source_identifier,
            format.label(),
            seq,
            now,
        ),
    };

    if index.contains_name(&name) {
        return Err(SnapshotError::DuplicateSnapshot {
            source_name: request.source_identifier,
            name,
        });
    }

    let batches = source::read_source(&request.source_path).map_err(SnapshotError::from)?;
    let schema = source::merged_schema(&batches).unwrap_or_default();
    let hash = content_hash(&schema, &batches);

    write_source_descriptor(backend, &source_key, &request.identity_path, &format)?;
    write_payload(backend, &source_key, &name, &schema, &batches)?;

    let row_count: u64 = batches.iter().map(|b| b.num_rows() as u64).sum();
    let meta = SnapshotMeta {
        name: name.clone(),
        source: request.source_identifier,
        source_path: normalized_source_path,
        format: format.label().to_string(),
        sequence: seq,
        row_count,
        column_count: schema.len() as u64,
        schema,
        content_hash: hash.clone(),
        created_at: now,
    };

    let meta_bytes = serde_json::to_vec_pretty(&meta)?;
    backend.put_blob(&meta_key(&source_key, &name), &meta_bytes)?;

    index.entries.push(IndexEntry {
        name,
        sequence: seq,
        content_hash: hash,
        created_at: now,
    });
    save_index(backend, &source_key, &index)?;

    Ok(CreateSnapshotOutcome { meta })
}

fn write_source_descriptor(
    backend: &dyn StorageBackend,
    source_key: &str,
    identity_path: &std::path::Path,
    format: &SourceFormat,
) -> SnapshotResult<()> {
    let descriptor = SourceDescriptor {
        path: identity_path.to_string_lossy().to_string(),
        format: format.label().to_string(),
    };
    let bytes = serde_json::to_vec_pretty(&descriptor)?;
    backend.put_blob(&source_descriptor_key(source_key), &bytes)?;
    Ok(())
}

fn write_payload(
    backend: &dyn StorageBackend,
    source_key: &str,
    name: &str,
    schema: &Schema,
    batches: &[RecordBatch],
) -> SnapshotResult<()> {
    let bytes = source::write_parquet_bytes(schema, batches).map_err(SnapshotError::from)?;
    backend.put_blob(&data_key(source_key, name), &bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalBackend;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &std::path::Path, contents: &str) -> PathBuf {
        let path = dir.join("employees.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn first_snapshot_gets_sequence_one() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        let csv_path = write_csv(temp.path(), "id,name\n1,Alice\n2,Bob\n");

        let outcome = create_snapshot(
            &backend,
            CreateSnapshotRequest {
                source_identifier: "employees".into(),
                identity_path: PathBuf::from("employees.csv"),
                source_path: csv_path,
                name_override: None,
                default_name_pattern: "{source}_{format}_{seq}",
            },
        )
        .unwrap();

        assert_eq!(outcome.meta.sequence, 1);
        assert_eq!(outcome.meta.row_count, 2);
        assert_eq!(outcome.meta.name, "employees_csv_1");
    }

    #[test]
    fn source_descriptor_is_written_alongside_the_index() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        let csv_path = write_csv(temp.path(), "id,name\n1,Alice\n");
        let source_key = source_key_hash("employees.csv");

        create_snapshot(
            &backend,
            CreateSnapshotRequest {
                source_identifier: "employees".into(),
                identity_path: PathBuf::from("employees.csv"),
                source_path: csv_path,
                name_override: Some("v1".into()),
                default_name_pattern: "{source}_{format}_{seq}",
            },
        )
        .unwrap();

        let bytes = backend.get_blob(&source_descriptor_key(&source_key)).unwrap();
        let descriptor: SourceDescriptor = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(descriptor.path, "employees.csv");
        assert_eq!(descriptor.format, "csv");
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        let csv_path = write_csv(temp.path(), "id,name\n1,Alice\n");

        create_snapshot(
            &backend,
            CreateSnapshotRequest {
                source_identifier: "employees".into(),
                identity_path: PathBuf::from("employees.csv"),
                source_path: csv_path.clone(),
                name_override: Some("v1".into()),
                default_name_pattern: "{source}_{format}_{seq}",
            },
        )
        .unwrap();

        let result = create_snapshot(
            &backend,
            CreateSnapshotRequest {
                source_identifier: "employees".into(),
                identity_path: PathBuf::from("employees.csv"),
                source_path: csv_path,
                name_override: Some("v1".into()),
                default_name_pattern: "{source}_{format}_{seq}",
            },
        );
        assert!(matches!(result, Err(SnapshotError::DuplicateSnapshot { .. })));
    }
}
