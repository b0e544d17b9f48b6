//! Top-level error taxonomy for the workspace engine.
//!
//! Every subsystem owns a narrower error enum scoped to its own concerns
//! (`config::ConfigError`, `storage::StorageError`, `source::SourceError`,
//! `snapshot::SnapshotError`, `catalog::CatalogError`, `query::QueryError`,
//! `diff::DiffError`). `SnapbaseError` is the union type the workspace façade
//! returns from every public operation, with `From` conversions from each of
//! those so call sites can just use `?`.

use std::fmt;

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::diff::DiffError;
use crate::query::QueryError;
use crate::snapshot::SnapshotError;
use crate::source::SourceError;
use crate::storage::StorageError;

/// Stable error code, independent of the human message, used for CLI exit
/// codes and for any future FFI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConfigError,
    IoError,
    FileNotFound,
    UnsupportedFormat,
    SchemaDrift,
    MalformedRecord,
    EncodingError,
    DuplicateSnapshot,
    SnapshotNotFound,
    AmbiguousName,
    ResourceBusy,
    SqlParseError,
    TableNotFound,
    ColumnTypeConflict,
    FileExists,
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "ConfigError",
            Self::IoError => "IoError",
            Self::FileNotFound => "FileNotFound",
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::SchemaDrift => "SchemaDrift",
            Self::MalformedRecord => "MalformedRecord",
            Self::EncodingError => "EncodingError",
            Self::DuplicateSnapshot => "DuplicateSnapshot",
            Self::SnapshotNotFound => "SnapshotNotFound",
            Self::AmbiguousName => "AmbiguousName",
            Self::ResourceBusy => "ResourceBusy",
            Self::SqlParseError => "SqlParseError",
            Self::TableNotFound => "TableNotFound",
            Self::ColumnTypeConflict => "ColumnTypeConflict",
            Self::FileExists => "FileExists",
            Self::Cancelled => "Cancelled",
        }
    }

    /// CLI exit code per the external interface spec: 0 success, 2 usage
    /// error, 3 not found, 4 conflict, 5 I/O error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::FileNotFound | Self::SnapshotNotFound | Self::TableNotFound => 3,
            Self::DuplicateSnapshot | Self::FileExists | Self::AmbiguousName => 4,
            Self::IoError | Self::EncodingError | Self::ResourceBusy => 5,
            Self::ConfigError
            | Self::UnsupportedFormat
            | Self::SchemaDrift
            | Self::MalformedRecord
            | Self::SqlParseError
            | Self::ColumnTypeConflict
            | Self::Cancelled => 2,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type returned from the workspace façade.
pub type SnapbaseResult<T> = Result<T, SnapbaseError>;

/// Union error type returned from every public workspace operation.
#[derive(Debug, Error)]
pub enum SnapbaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("operation cancelled")]
    Cancelled,
}

impl SnapbaseError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Storage(e) => e.code(),
            Self::Source(e) => e.code(),
            Self::Snapshot(e) => e.code(),
            Self::Catalog(e) => e.code(),
            Self::Query(e) => e.code(),
            Self::Diff(e) => e.code(),
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }
}
