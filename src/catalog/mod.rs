//! Snapshot catalog (§4.5).
//!
//! An in-memory projection of every source's `index.json`, lazily loaded
//! and invalidated whenever the storage root's generation counter
//! (`index.version`) moves past what's cached — which every writer bumps
//! while holding the exclusive workspace lock (§5).

mod errors;

pub use errors::{CatalogError, CatalogResult};

use std::sync::Mutex;

use serde::Serialize;

use crate::snapshot::{self, IndexFile, SnapshotMeta};
use crate::storage::StorageBackend;

const VERSION_KEY: &str = "index.version";

/// One snapshot as seen by the catalog, with enough context to resolve it
/// back to storage keys without re-walking `sources/`.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub source: String,
    pub source_key: String,
    pub name: String,
    pub sequence: u64,
    pub content_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Default)]
struct Cache {
    generation: Option<u64>,
    entries: Vec<CatalogEntry>,
}

/// In-memory projection of the workspace's snapshot indices.
pub struct Catalog {
    cache: Mutex<Cache>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Read the current generation counter, defaulting to 0 when no writer
    /// has ever bumped it.
    pub fn read_generation(backend: &dyn StorageBackend) -> CatalogResult<u64> {
        if !backend.exists(VERSION_KEY)? {
            return Ok(0);
        }
        let bytes = backend.get_blob(VERSION_KEY)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(text.trim().parse().unwrap_or(0))
    }

    /// Bump the generation counter. Caller must hold the exclusive lock.
    pub fn bump_generation(backend: &dyn StorageBackend) -> CatalogResult<u64> {
        let next = Self::read_generation(backend)? + 1;
        backend.put_blob(VERSION_KEY, next.to_string().as_bytes())?;
        Ok(next)
    }

    /// Return the cached snapshot list, reloading from storage if the
    /// generation counter has moved.
    fn entries(&self, backend: &dyn StorageBackend) -> CatalogResult<Vec<CatalogEntry>> {
        let current_generation = Self::read_generation(backend)?;
        let mut cache = self.cache.lock().expect("catalog cache mutex poisoned");
        if cache.generation != Some(current_generation) {
            cache.entries = load_all_entries(backend)?;
            cache.generation = Some(current_generation);
        }
        Ok(cache.entries.clone())
    }

    pub fn list_snapshots(&self, backend: &dyn StorageBackend) -> CatalogResult<Vec<CatalogEntry>> {
        let mut entries = self.entries(backend)?;
        entries.sort_by(|a, b| (a.source_key.clone(), a.sequence).cmp(&(b.source_key.clone(), b.sequence)));
        Ok(entries)
    }

    pub fn list_snapshots_for_source(
        &self,
        backend: &dyn StorageBackend,
        source: &str,
    ) -> CatalogResult<Vec<CatalogEntry>> {
        let mut entries: Vec<CatalogEntry> = self
            .entries(backend)?
            .into_iter()
            .filter(|e| e.source == source)
            .collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    /// Resolve a snapshot name, optionally scoped to `source`. Without a
    /// source, the name must be unique across the whole workspace.
    pub fn resolve(
        &self,
        backend: &dyn StorageBackend,
        name: &str,
        source: Option<&str>,
    ) -> CatalogResult<CatalogEntry> {
        let entries = self.entries(backend)?;
        let mut matches: Vec<&CatalogEntry> = entries
            .iter()
            .filter(|e| e.name == name && source.map(|s| s == e.source).unwrap_or(true))
            .collect();

        match matches.len() {
            0 => Err(CatalogError::NotFound(name.to_string())),
            1 => Ok(matches.remove(0).clone()),
            _ => Err(CatalogError::AmbiguousName {
                name: name.to_string(),
                sources: matches.iter().map(|e| e.source.clone()).collect(),
            }),
        }
    }

    pub fn snapshot_exists(
        &self,
        backend: &dyn StorageBackend,
        name: &str,
        source: Option<&str>,
    ) -> CatalogResult<bool> {
        match self.resolve(backend, name, source) {
            Ok(_) => Ok(true),
            Err(CatalogError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn stats(&self, backend: &dyn StorageBackend) -> CatalogResult<CatalogStats> {
        let entries = self.entries(backend)?;
        let mut sources = std::collections::HashSet::new();
        let mut total_rows = 0u64;
        let mut storage_bytes = 0u64;

        for entry in &entries {
            sources.insert(entry.source_key.clone());
            let meta = load_meta(backend, &entry.source_key, &entry.name)?;
            total_rows += meta.row_count;
            let data_key = snapshot::data_key(&entry.source_key, &entry.name);
            if let Ok(bytes) = backend.get_blob(&data_key) {
                storage_bytes += bytes.len() as u64;
            }
        }

        Ok(CatalogStats {
            snapshot_count: entries.len() as u64,
            source_count: sources.len() as u64,
            total_rows,
            storage_bytes,
        })
    }

    /// Scan for snapshot directories with payload + metadata but no index
    /// entry (crash between payload write and index update, §4.4) and
    /// either adopt or remove them.
    pub fn reconcile(&self, backend: &dyn StorageBackend) -> CatalogResult<ReconciliationReport> {
        let mut report = ReconciliationReport::default();
        let source_keys = backend.list("sources")?;

        for source_dir in source_keys {
            let source_key = source_dir.rsplit('/').next().unwrap_or(&source_dir).to_string();
            let mut index = snapshot::load_index(backend, &source_key)?;
            let snapshots_prefix = format!("{}/snapshots", snapshot::source_prefix(&source_key));
            let snapshot_dirs = backend.list(&snapshots_prefix).unwrap_or_default();

            let mut dirty = false;
            for dir in snapshot_dirs {
                let name = dir.rsplit('/').next().unwrap_or(&dir).to_string();
                if index.contains_name(&name) {
                    continue;
                }
                let meta_key = snapshot::meta_key(&source_key, &name);
                if backend.exists(&meta_key)? {
                    if let Ok(meta) = load_meta(backend, &source_key, &name) {
                        index.entries.push(crate::snapshot::IndexEntry {
                            name: meta.name,
                            sequence: meta.sequence,
                            content_hash: meta.content_hash,
                            created_at: meta.created_at,
                        });
                        index.entries.sort_by_key(|e| e.sequence);
                        dirty = true;
                        report.adopted.push(name);
                        continue;
                    }
                }
                backend.delete_prefix(&dir)?;
                report.removed.push(name);
                dirty = true;
            }

            if dirty {
                let bytes = serde_json::to_vec_pretty(&index).map_err(|e| {
                    CatalogError::Snapshot(crate::snapshot::SnapshotError::from(e))
                })?;
                backend.put_blob(&format!("{}/index.json", snapshot::source_prefix(&source_key)), &bytes)?;
                Self::bump_generation(backend)?;
            }
        }

        Ok(report)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Serialize)]
pub struct CatalogStats {
    pub snapshot_count: u64,
    pub source_count: u64,
    pub total_rows: u64,
    pub storage_bytes: u64,
}

#[derive(Debug, Default)]
pub struct ReconciliationReport {
    pub adopted: Vec<String>,
    pub removed: Vec<String>,
}

fn load_all_entries(backend: &dyn StorageBackend) -> CatalogResult<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    let source_dirs = backend.list("sources").unwrap_or_default();

    for dir in source_dirs {
        let source_key = dir.rsplit('/').next().unwrap_or(&dir).to_string();
        let index: IndexFile = snapshot::load_index(backend, &source_key)?;
        for entry in index.entries {
            entries.push(CatalogEntry {
                source: index.source.clone(),
                source_key: source_key.clone(),
                name: entry.name,
                sequence: entry.sequence,
                content_hash: entry.content_hash,
                created_at: entry.created_at,
            });
        }
    }

    Ok(entries)
}

fn load_meta(backend: &dyn StorageBackend, source_key: &str, name: &str) -> CatalogResult<SnapshotMeta> {
    let key = snapshot::meta_key(source_key, name);
    let bytes = backend.get_blob(&key)?;
    serde_json::from_slice(&bytes).map_err(|e| CatalogError::Snapshot(crate::snapshot::SnapshotError::from(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{create_snapshot, CreateSnapshotRequest};
    use crate::storage::LocalBackend;
    use std::io::Write;
    use tempfile::TempDir;

    fn make_source(dir: &std::path::Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn lists_snapshots_after_commit() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());
        let csv_path = make_source(temp.path(), "employees.csv", "id,name\n1,Alice\n");

        create_snapshot(
            &backend,
            CreateSnapshotRequest {
                source_identifier: "employees".into(),
                source_path: csv_path,
                name_override: Some("v1".into()),
                default_name_pattern: "{source}_{format}_{seq}",
            },
        )
        .unwrap();

        let catalog = Catalog::new();
        let snapshots = catalog.list_snapshots(&backend).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].name, "v1");
    }

    #[test]
    fn resolve_without_source_requires_uniqueness() {
        let temp = TempDir::new().unwrap();
        let storage = TempDir::new().unwrap();
        let backend = LocalBackend::new(storage.path().to_path_buf());

        let a = make_source(temp.path(), "a.csv", "id\n1\n");
        let b = make_source(temp.path(), "b.csv", "id\n1\n");

        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "a".into(), source_path: a, name_override: Some("shared".into()), default_name_pattern: "{source}_{format}_{seq}",
        }).unwrap();
        create_snapshot(&backend, CreateSnapshotRequest {
            source_identifier: "b".into(), source_path: b, name_override: Some("shared".into()), default_name_pattern: "{source}_{format}_{seq}",
        }).unwrap();

        let catalog = Catalog::new();
        let result = catalog.resolve(&backend, "shared", None);
        assert!(matches!(result, Err(CatalogError::AmbiguousName { .. })));

        let scoped = catalog.resolve(&backend, "shared", Some("a")).unwrap();
        assert_eq!(scoped.source, "a");
    }
}
