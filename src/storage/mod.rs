//! Storage backend abstraction (§4.2).
//!
//! `StorageBackend` is the seam between the engine and the medium holding
//! snapshot bytes. Only a local filesystem implementation exists today;
//! `storage.backend` in config is kept as a string specifically so a future
//! cloud backend doesn't require a config schema migration.

mod backend;
mod errors;
mod local;
mod lock;

pub use backend::StorageBackend;
pub use errors::{LockKind, StorageError, StorageResult};
pub use local::LocalBackend;
pub use lock::{lock_path, WorkspaceLock};

use std::time::Duration;

/// Default time a caller waits for a contended lock before giving up (§5).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the backend named by `config.storage.backend`, rooted at
/// `storage_root`. Only `"local"` is recognized today.
pub fn open_backend(
    backend_name: &str,
    storage_root: std::path::PathBuf,
) -> StorageResult<Box<dyn StorageBackend>> {
    match backend_name {
        "local" => Ok(Box::new(LocalBackend::new(storage_root))),
        other => Err(StorageError::InvalidPath(format!(
            "unsupported storage backend: {other}"
        ))),
    }
}
