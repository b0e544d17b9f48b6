//! Source ingestion error type.

use thiserror::Error;

use crate::error::ErrorCode;

pub type SourceResult<T> = Result<T, SourceError>;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("schema drift detected in {path}: record at line {line} introduces column(s) {columns:?} not seen in the first {sampled} records")]
    SchemaDrift {
        path: std::path::PathBuf,
        line: usize,
        columns: Vec<String>,
        sampled: usize,
    },

    #[error("encoding error reading {path}: {message}")]
    EncodingError {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("malformed record in {path} at line {line}, column {column}: {message}")]
    MalformedRecord {
        path: std::path::PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::FileNotFound(_) => ErrorCode::FileNotFound,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::SchemaDrift { .. } => ErrorCode::SchemaDrift,
            Self::EncodingError { .. } => ErrorCode::EncodingError,
            Self::MalformedRecord { .. } => ErrorCode::MalformedRecord,
            Self::Io { .. } => ErrorCode::IoError,
        }
    }
}
