//! Snapshot writer (§4.4).
//!
//! Commits named, immutable point-in-time copies of a structured-data
//! source. Snapshots are never updated or deleted through this module;
//! the catalog and diff engine only ever read what's committed here.

mod creator;
mod errors;
mod manifest;

pub use creator::{
    create_snapshot, data_key, load_index, meta_key, source_prefix, CreateSnapshotOutcome,
    CreateSnapshotRequest,
};
pub use errors::{SnapshotError, SnapshotResult};
pub use manifest::{
    content_hash, expand_name_pattern, hash8, source_key_hash, IndexEntry, IndexFile, SnapshotMeta,
};
