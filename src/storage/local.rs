//! Local filesystem storage backend.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};

/// Storage backend rooted at a directory on the local filesystem.
///
/// Writes go to a sibling temp file first, then `rename` into place, so a
/// reader never observes a partially-written object (§4.2, §5 crash safety).
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    fn io_err(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl StorageBackend for LocalBackend {
    fn put_blob(&self, path: &str, data: &[u8]) -> StorageResult<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_err(parent, e))?;
        }

        let mut tmp_name = full_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = full_path.with_file_name(tmp_name);
        fs::write(&tmp_path, data).map_err(|e| Self::io_err(&tmp_path, e))?;
        fs::rename(&tmp_path, &full_path).map_err(|e| Self::io_err(&full_path, e))?;
        Ok(())
    }

    fn get_blob(&self, path: &str) -> StorageResult<Vec<u8>> {
        let full_path = self.full_path(path);
        fs::read(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::ObjectNotFound(path.to_string())
            } else {
                Self::io_err(&full_path, e)
            }
        })
    }

    fn open_reader(&self, path: &str) -> StorageResult<Box<dyn Read + Send>> {
        let full_path = self.full_path(path);
        let file = File::open(&full_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::ObjectNotFound(path.to_string())
            } else {
                Self::io_err(&full_path, e)
            }
        })?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.full_path(path).exists())
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let full_path = self.full_path(prefix);
        let mut results = Vec::new();

        if !full_path.is_dir() {
            return Ok(results);
        }

        let entries = fs::read_dir(&full_path).map_err(|e| Self::io_err(&full_path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Self::io_err(&full_path, e))?;
            if let Some(name) = entry.file_name().to_str() {
                let key = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{prefix}/{name}")
                };
                results.push(key);
            }
        }
        results.sort();
        Ok(results)
    }

    fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let full_path = self.full_path(prefix);
        match fs::remove_dir_all(&full_path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_err(&full_path, e)),
        }
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        Some(self.full_path(path))
    }
}
