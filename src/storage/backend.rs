//! Abstract storage backend (§4.2).

use std::io::Read;
use std::path::PathBuf;

use super::errors::StorageResult;

/// Content-addressed-by-path blob storage. `path` is always a `/`-separated
/// key relative to the backend's root; backends are responsible for mapping
/// that key onto their own storage medium.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Write `data` at `path`, replacing any existing object atomically.
    fn put_blob(&self, path: &str, data: &[u8]) -> StorageResult<()>;

    /// Read the full contents of `path`.
    fn get_blob(&self, path: &str) -> StorageResult<Vec<u8>>;

    /// Open a streaming reader over `path`, for payloads too large to
    /// buffer wholesale (columnar snapshot files).
    fn open_reader(&self, path: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Whether an object exists at `path`.
    fn exists(&self, path: &str) -> StorageResult<bool>;

    /// List immediate children under `prefix` (one level, not recursive).
    fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Remove every object under `prefix`.
    fn delete_prefix(&self, prefix: &str) -> StorageResult<()>;

    /// A real filesystem path for `path`, when this backend is backed by
    /// one. `duckdb`'s `read_parquet` reads files directly rather than
    /// through this trait, so the query and diff engines need a way to get
    /// from a logical key to a path duckdb can open. Backends with no
    /// filesystem representation return `None`.
    fn local_path(&self, path: &str) -> Option<PathBuf>;
}
