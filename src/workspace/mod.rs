//! Workspace façade (§4.8).
//!
//! Composes config resolution, the storage backend, the snapshot writer,
//! the catalog, the query engine, and the diff engine behind the library's
//! public surface (§6). Holds no mutable state beyond a cached
//! `WorkspaceContext` and a lazily-populated catalog; everything else lives
//! in the storage backend.

use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::record_batch::RecordBatch as ArrowRecordBatch;

use crate::catalog::{Catalog, CatalogError, CatalogStats, ReconciliationReport};
use crate::config::{self, ConfigSource, WorkspaceOrigin};
use crate::diff::{self, DiffOutcome};
use crate::error::{SnapbaseError, SnapbaseResult};
use crate::query::{self, QueryRequest};
use crate::snapshot::{self, CreateSnapshotRequest};
use crate::storage::{self, LockKind, StorageBackend, StorageError, WorkspaceLock, DEFAULT_LOCK_TIMEOUT};

/// Resolve `.`/`..` components syntactically, without consulting the
/// filesystem (no symlink resolution, no existence check).
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => match result.components().next_back() {
                Some(std::path::Component::Normal(_)) => {
                    result.pop();
                }
                _ => result.push(component),
            },
            other => result.push(other),
        }
    }
    result
}

/// A handle to one workspace: a resolved config plus the storage backend it
/// points at. Cheap to construct; the catalog populates lazily on first use.
pub struct Workspace {
    workspace_path: PathBuf,
    config_source: ConfigSource,
    config_path: Option<PathBuf>,
    default_name_pattern: String,
    storage_root: PathBuf,
    backend: Box<dyn StorageBackend>,
    catalog: Catalog,
}

impl Workspace {
    /// Resolve config and open the configured storage backend (§4.1, §4.2).
    /// `path` follows the same semantics as the CLI's workspace flag: `None`
    /// or an empty string resolves implicitly against the current
    /// directory and may inherit an ancestor's `snapbase.toml`; any other
    /// value is explicit and never inherits.
    pub fn new(path: Option<&str>) -> SnapbaseResult<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            SnapbaseError::Storage(StorageError::Io {
                path: PathBuf::from("."),
                source: e,
            })
        })?;
        let origin = WorkspaceOrigin::from_input(path, cwd);
        let context = config::resolve(&origin)?;
        let storage_root = context.storage_root();
        let backend = storage::open_backend(&context.config.storage.backend, storage_root.clone())?;

        Ok(Self {
            workspace_path: context.workspace_path,
            config_source: context.config_source,
            config_path: context.config_path,
            default_name_pattern: context.config.snapshot.default_name_pattern,
            storage_root,
            backend,
            catalog: Catalog::new(),
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.workspace_path
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "config_source": match self.config_source {
                ConfigSource::Workspace => "workspace",
                ConfigSource::Default => "default",
            },
            "config_path": self.config_path.as_ref().map(|p| p.display().to_string()),
            "workspace_path": self.workspace_path.display().to_string(),
        })
    }

    fn lock_path(&self) -> PathBuf {
        storage::lock_path(&self.storage_root)
    }

    fn acquire_shared(&self) -> SnapbaseResult<WorkspaceLock> {
        match WorkspaceLock::acquire(&self.lock_path(), LockKind::Shared, DEFAULT_LOCK_TIMEOUT) {
            Ok(lock) => Ok(lock),
            Err(e) => {
                log::warn!("timed out waiting for shared lock on {}", self.lock_path().display());
                Err(SnapbaseError::from(e))
            }
        }
    }

    fn acquire_exclusive(&self) -> SnapbaseResult<WorkspaceLock> {
        match WorkspaceLock::acquire(&self.lock_path(), LockKind::Exclusive, DEFAULT_LOCK_TIMEOUT) {
            Ok(lock) => Ok(lock),
            Err(e) => {
                log::warn!("timed out waiting for exclusive lock on {}", self.lock_path().display());
                Err(SnapbaseError::from(e))
            }
        }
    }

    /// A `source` argument is a path, relative to the workspace root unless
    /// absolute, to the file backing that source.
    fn resolve_source_path(&self, source: &str) -> PathBuf {
        let candidate = Path::new(source);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace_path.join(candidate)
        }
    }

    /// The path identifying a source for hashing purposes, independent of
    /// how the caller spelled it: lexically normalized (`.`/`..` resolved
    /// without touching the filesystem, since the source may not exist yet)
    /// and relative to the workspace root when it falls under it. Two
    /// arguments that resolve to the same file must produce the same
    /// identity path, or they'd be hashed into two different source
    /// directories (spec.md's Source definition: "two sources with the
    /// same relative path are the same source").
    fn source_identity_path(&self, source: &str) -> PathBuf {
        let absolute = normalize_lexically(&self.resolve_source_path(source));
        let workspace = normalize_lexically(&self.workspace_path);
        absolute.strip_prefix(&workspace).map(Path::to_path_buf).unwrap_or(absolute)
    }

    /// Idempotently create the storage root. Safe to call on an
    /// already-initialized workspace.
    pub fn init(&self) -> SnapbaseResult<()> {
        std::fs::create_dir_all(&self.storage_root).map_err(|e| {
            SnapbaseError::Storage(StorageError::Io {
                path: self.storage_root.clone(),
                source: e,
            })
        })?;
        log::info!("initialized workspace at {}", self.workspace_path.display());
        Ok(())
    }

    /// Commit a new snapshot of `source` (§4.4). Returns a one-line summary
    /// for CLI display.
    pub fn create_snapshot(&self, source: &str, name: Option<&str>) -> SnapbaseResult<String> {
        let source_path = self.resolve_source_path(source);
        let identity_path = self.source_identity_path(source);
        let _lock = self.acquire_exclusive()?;

        let outcome = snapshot::create_snapshot(
            self.backend.as_ref(),
            CreateSnapshotRequest {
                source_identifier: source.to_string(),
                source_path,
                identity_path,
                name_override: name.map(|s| s.to_string()),
                default_name_pattern: &self.default_name_pattern,
            },
        )?;
        Catalog::bump_generation(self.backend.as_ref())?;

        log::info!(
            "committed snapshot {} seq={} rows={} columns={}",
            outcome.meta.name,
            outcome.meta.sequence,
            outcome.meta.row_count,
            outcome.meta.column_count,
        );

        Ok(format!(
            "{} rows={} columns={}",
            outcome.meta.name, outcome.meta.row_count, outcome.meta.column_count
        ))
    }

    pub fn snapshot_exists(&self, name: &str) -> SnapbaseResult<bool> {
        let _lock = self.acquire_shared()?;
        Ok(self.catalog.snapshot_exists(self.backend.as_ref(), name, None)?)
    }

    pub fn list_snapshots(&self) -> SnapbaseResult<Vec<String>> {
        let _lock = self.acquire_shared()?;
        Ok(self
            .catalog
            .list_snapshots(self.backend.as_ref())?
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    pub fn list_snapshots_for_source(&self, source: &str) -> SnapbaseResult<Vec<String>> {
        let _lock = self.acquire_shared()?;
        Ok(self
            .catalog
            .list_snapshots_for_source(self.backend.as_ref(), source)?
            .into_iter()
            .map(|e| e.name)
            .collect())
    }

    pub fn stats(&self) -> SnapbaseResult<CatalogStats> {
        let _lock = self.acquire_shared()?;
        Ok(self.catalog.stats(self.backend.as_ref())?)
    }

    /// Reconcile the catalog against the snapshot directories actually on
    /// disk, adopting or discarding orphans left by a crash between the
    /// payload write and the index update (§4.4, §4.5).
    pub fn reconcile(&self) -> SnapbaseResult<ReconciliationReport> {
        let _lock = self.acquire_exclusive()?;
        let report = self.catalog.reconcile(self.backend.as_ref())?;
        if !report.adopted.is_empty() || !report.removed.is_empty() {
            log::warn!(
                "reconciliation adopted {} orphan snapshot(s), removed {}",
                report.adopted.len(),
                report.removed.len()
            );
        }
        Ok(report)
    }

    pub fn query(&self, source: &str, sql: &str, limit: Option<u64>) -> SnapbaseResult<Vec<ArrowRecordBatch>> {
        let _lock = self.acquire_shared()?;
        let started = Instant::now();
        let outcome = query::query(
            self.backend.as_ref(),
            &self.catalog,
            QueryRequest { source, sql, limit, strict: false },
        )?;
        log::debug!(
            "query on {} returned {} batch(es) in {:?}",
            source,
            outcome.batches.len(),
            started.elapsed()
        );
        Ok(outcome.batches)
    }

    pub fn diff(&self, source: &str, from: &str, to: &str) -> SnapbaseResult<DiffOutcome> {
        let _lock = self.acquire_shared()?;
        let started = Instant::now();
        let outcome = diff::diff(self.backend.as_ref(), &self.catalog, source, from, to, None)?;
        log::debug!(
            "diff {source} {from}..{to}: +{} -{} ~{} in {:?}",
            outcome.summary.rows_added,
            outcome.summary.rows_removed,
            outcome.summary.rows_modified,
            started.elapsed()
        );
        Ok(outcome)
    }

    /// Diff the current on-disk file for `source` against `baseline`,
    /// without committing a snapshot.
    pub fn detect_changes(&self, source: &str, baseline: &str) -> SnapbaseResult<DiffOutcome> {
        let _lock = self.acquire_shared()?;
        let live_path = self.resolve_source_path(source);
        Ok(diff::detect_changes(
            self.backend.as_ref(),
            &self.catalog,
            source,
            baseline,
            &live_path,
            None,
        )?)
    }

    /// Like `detect_changes`, but defaults `baseline` to the source's most
    /// recent snapshot when none is given — the shape the `status` CLI
    /// subcommand needs for its optional positional argument.
    pub fn status(&self, source: &str, baseline: Option<&str>) -> SnapbaseResult<DiffOutcome> {
        let baseline_name = match baseline {
            Some(name) => name.to_string(),
            None => {
                let entries = self.list_snapshots_for_source(source)?;
                entries
                    .last()
                    .cloned()
                    .ok_or_else(|| SnapbaseError::Catalog(CatalogError::NotFound(source.to_string())))?
            }
        };
        self.detect_changes(source, &baseline_name)
    }

    /// Copy a snapshot's committed payload out to `dest` (§6). Refuses to
    /// overwrite an existing file unless `force` is set.
    pub fn export(&self, source: &str, dest: &Path, snapshot_name: &str, force: bool) -> SnapbaseResult<()> {
        let _lock = self.acquire_shared()?;
        let entry = self.catalog.resolve(self.backend.as_ref(), snapshot_name, Some(source))?;

        if dest.exists() && !force {
            return Err(SnapbaseError::Storage(StorageError::ObjectAlreadyExists(
                dest.display().to_string(),
            )));
        }

        let data_key = snapshot::data_key(&entry.source_key, &entry.name);
        let bytes = self.backend.get_blob(&data_key)?;
        std::fs::write(dest, bytes).map_err(|e| {
            SnapbaseError::Storage(StorageError::Io {
                path: dest.to_path_buf(),
                source: e,
            })
        })?;

        log::info!("exported snapshot {} to {}", entry.name, dest.display());
        Ok(())
    }
}
