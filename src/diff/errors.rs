//! Diff engine error type.

use thiserror::Error;

use crate::error::ErrorCode;

pub type DiffResult<T> = Result<T, DiffError>;

#[derive(Debug, Error)]
pub enum DiffError {
    #[error(transparent)]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    Source(#[from] crate::source::SourceError),

    #[error("duckdb error: {0}")]
    Engine(String),
}

impl DiffError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Catalog(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Source(e) => e.code(),
            Self::Engine(_) => ErrorCode::SqlParseError,
        }
    }
}
