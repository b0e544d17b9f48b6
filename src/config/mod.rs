//! Workspace configuration resolution.
//!
//! Per CONFIG.md-equivalent rules for snapbase:
//!
//! - `snapbase.toml` directly in the workspace root takes priority.
//! - Ancestor search only happens when the workspace was constructed with
//!   an *implicit* path (empty string / current directory). A workspace
//!   constructed with an *explicit* path never inherits a parent's config —
//!   this is load-bearing, not a convenience default.
//! - Missing file falls back to built-in defaults.
//!
//! # Design Principles
//!
//! - No hidden global state: the caller-supplied origin directory is
//!   threaded through explicitly rather than read from `std::env::current_dir()`
//!   deep in the resolver, so resolution is testable without mutating the
//!   process's working directory.

mod errors;
mod model;
mod origin;
mod resolver;

pub use errors::{ConfigError, ConfigResult};
pub use model::{Config, DatabasesConfig, SnapshotConfig, StorageConfig};
pub use origin::WorkspaceOrigin;
pub use resolver::{resolve, ConfigSource, WorkspaceContext};

pub const CONFIG_FILE_NAME: &str = "snapbase.toml";
