//! Storage backend error type.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::error::ErrorCode;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("object already exists: {0}")]
    ObjectAlreadyExists(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("could not acquire {kind} lock on {path} within {timeout:?}")]
    LockTimeout {
        path: PathBuf,
        kind: LockKind,
        timeout: Duration,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Shared,
    Exclusive,
}

impl std::fmt::Display for LockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Exclusive => write!(f, "exclusive"),
        }
    }
}

impl StorageError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ObjectNotFound(_) => ErrorCode::FileNotFound,
            Self::ObjectAlreadyExists(_) => ErrorCode::FileExists,
            Self::InvalidPath(_) => ErrorCode::ConfigError,
            Self::LockTimeout { .. } => ErrorCode::ResourceBusy,
            Self::Io { .. } => ErrorCode::IoError,
        }
    }
}
