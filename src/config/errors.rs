//! Config resolution error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for config resolution.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while locating or parsing workspace configuration.
///
/// Per ERRORS.md conventions, config errors are fatal to workspace
/// construction: a workspace handle is never returned half-configured.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `snapbase.toml` exists but could not be read (permissions, I/O).
    #[error("cannot read config at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `snapbase.toml` exists but is not valid TOML, or its shape does not
    /// match the expected schema.
    #[error("malformed config at {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    /// The supplied workspace path could not be canonicalized.
    #[error("invalid workspace path {path}: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
