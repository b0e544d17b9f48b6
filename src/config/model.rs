//! Configuration schema.
//!
//! `Config` is a direct mapping of `snapbase.toml`. Every field has a
//! default so the file is entirely optional.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_backend() -> String {
    "local".to_string()
}

fn default_storage_path() -> String {
    ".snapbase".to_string()
}

fn default_name_pattern() -> String {
    "{source}_{format}_{seq}".to_string()
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend kind. Only `"local"` is implemented; other values are
    /// reserved for future cloud backends (§4.2).
    pub backend: String,

    /// Subdirectory, relative to the workspace root, holding snapshot data.
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

/// `[snapshot]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Template for generated snapshot names. Recognized tokens:
    /// `{source}`, `{format}`, `{seq}`, `{timestamp}`.
    pub default_name_pattern: String,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            default_name_pattern: default_name_pattern(),
        }
    }
}

/// `[databases]` section — reserved mapping, not interpreted further by
/// the workspace engine.
pub type DatabasesConfig = HashMap<String, toml::Value>;

/// Root configuration object, deserialized from `snapbase.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub snapshot: SnapshotConfig,
    pub databases: DatabasesConfig,
}

impl Config {
    /// Parse a config from TOML source text. Unknown keys are ignored
    /// (serde's default struct behavior without `deny_unknown_fields`).
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let cfg = Config::from_toml_str("").unwrap();
        assert_eq!(cfg.storage.backend, "local");
        assert_eq!(cfg.storage.path, ".snapbase");
        assert_eq!(cfg.snapshot.default_name_pattern, "{source}_{format}_{seq}");
        assert!(cfg.databases.is_empty());
    }

    #[test]
    fn partial_override() {
        let cfg = Config::from_toml_str(
            r#"
            [storage]
            path = "custom_storage"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.path, "custom_storage");
        assert_eq!(cfg.storage.backend, "local");
    }

    #[test]
    fn unknown_keys_ignored() {
        let cfg = Config::from_toml_str(
            r#"
            unknown_top_level = true

            [storage]
            path = ".snapbase"
            unknown_nested = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.storage.path, ".snapbase");
    }
}
