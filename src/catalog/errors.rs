//! Catalog error type.

use thiserror::Error;

use crate::error::ErrorCode;

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("snapshot '{0}' not found in any source")]
    NotFound(String),

    #[error("snapshot name '{name}' is ambiguous: present under sources {sources:?}")]
    AmbiguousName { name: String, sources: Vec<String> },

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Snapshot(#[from] crate::snapshot::SnapshotError),
}

impl CatalogError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::SnapshotNotFound,
            Self::AmbiguousName { .. } => ErrorCode::AmbiguousName,
            Self::Storage(e) => e.code(),
            Self::Snapshot(e) => e.code(),
        }
    }
}
