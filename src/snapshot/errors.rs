//! Snapshot writer/reader error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorCode;

pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot '{name}' already exists for source '{source_name}'")]
    DuplicateSnapshot { source_name: String, name: String },

    #[error("snapshot '{name}' not found for source '{source_name}'")]
    SnapshotNotFound { source_name: String, name: String },

    #[error("malformed metadata at {path}: {message}")]
    MalformedMetadata { path: PathBuf, message: String },

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Source(#[from] crate::source::SourceError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl SnapshotError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateSnapshot { .. } => ErrorCode::DuplicateSnapshot,
            Self::SnapshotNotFound { .. } => ErrorCode::SnapshotNotFound,
            Self::MalformedMetadata { .. } => ErrorCode::IoError,
            Self::Storage(e) => e.code(),
            Self::Source(e) => e.code(),
            Self::Io { .. } => ErrorCode::IoError,
            Self::Serde(_) => ErrorCode::IoError,
        }
    }
}
