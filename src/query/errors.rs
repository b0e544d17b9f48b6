//! Query engine error type.

use thiserror::Error;

use crate::error::ErrorCode;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("SQL parse error: {0}")]
    SqlParseError(String),

    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("column '{column}' has irreconcilable type conflict across snapshots: {types:?}")]
    ColumnTypeConflict { column: String, types: Vec<String> },

    #[error("query matched zero rows")]
    EmptyResult,

    #[error(transparent)]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error("duckdb error: {0}")]
    Engine(String),
}

impl QueryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::SqlParseError(_) => ErrorCode::SqlParseError,
            Self::TableNotFound(_) => ErrorCode::TableNotFound,
            Self::ColumnTypeConflict { .. } => ErrorCode::ColumnTypeConflict,
            Self::EmptyResult => ErrorCode::SqlParseError,
            Self::Catalog(e) => e.code(),
            Self::Storage(e) => e.code(),
            Self::Engine(_) => ErrorCode::SqlParseError,
        }
    }
}
