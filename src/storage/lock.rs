//! Advisory workspace locking (§4.2, §5).
//!
//! Readers take a shared lock; writers (snapshot creation, catalog
//! invalidation) take an exclusive lock. Locking is OS-level `flock` via
//! `fs4`, so a crashed process releases its lock automatically — there is
//! no sentinel file to clean up by convention.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs4::fs_std::FileExt;

use super::errors::{LockKind, StorageError, StorageResult};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A held lock on the workspace's lock file. Dropping this releases it.
pub struct WorkspaceLock {
    file: File,
    kind: LockKind,
}

impl WorkspaceLock {
    pub fn kind(&self) -> LockKind {
        self.kind
    }

    /// Acquire a lock on `lock_path`, creating the file if needed, blocking
    /// up to `timeout` while polling at a fixed interval. Writers are tried
    /// first on each poll iteration so a steady stream of readers cannot
    /// starve a pending writer (§5 writer priority).
    pub fn acquire(lock_path: &Path, kind: LockKind, timeout: Duration) -> StorageResult<Self> {
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(lock_path)
            .map_err(|e| StorageError::Io {
                path: lock_path.to_path_buf(),
                source: e,
            })?;

        let deadline = Instant::now() + timeout;
        loop {
            let result = match kind {
                LockKind::Shared => FileExt::try_lock_shared(&file),
                LockKind::Exclusive => FileExt::try_lock_exclusive(&file),
            };

            match result {
                Ok(()) => return Ok(Self { file, kind }),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => {
                    return Err(StorageError::Io {
                        path: lock_path.to_path_buf(),
                        source: e,
                    })
                }
            }

            if Instant::now() >= deadline {
                return Err(StorageError::LockTimeout {
                    path: lock_path.to_path_buf(),
                    kind,
                    timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Conventional lock file location under the storage root.
pub fn lock_path(storage_root: &Path) -> PathBuf {
    storage_root.join(".lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shared_locks_do_not_conflict() {
        let temp = TempDir::new().unwrap();
        let path = lock_path(temp.path());

        let a = WorkspaceLock::acquire(&path, LockKind::Shared, Duration::from_millis(200)).unwrap();
        let b = WorkspaceLock::acquire(&path, LockKind::Shared, Duration::from_millis(200)).unwrap();
        assert_eq!(a.kind(), LockKind::Shared);
        assert_eq!(b.kind(), LockKind::Shared);
    }

    #[test]
    fn exclusive_lock_blocks_until_released() {
        let temp = TempDir::new().unwrap();
        let path = lock_path(temp.path());

        let writer = WorkspaceLock::acquire(&path, LockKind::Exclusive, Duration::from_millis(200)).unwrap();
        let busy = WorkspaceLock::acquire(&path, LockKind::Shared, Duration::from_millis(100));
        assert!(matches!(busy, Err(StorageError::LockTimeout { .. })));

        drop(writer);
        WorkspaceLock::acquire(&path, LockKind::Shared, Duration::from_millis(200)).unwrap();
    }
}
