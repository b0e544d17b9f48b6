//! Config resolution algorithm (§4.1).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::errors::{ConfigError, ConfigResult};
use super::model::Config;
use super::origin::WorkspaceOrigin;
use super::CONFIG_FILE_NAME;

/// Where the effective configuration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Workspace,
    Default,
}

/// The resolved workspace: absolute root, effective config, and provenance.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub workspace_path: PathBuf,
    pub config: Config,
    pub config_source: ConfigSource,
    pub config_path: Option<PathBuf>,
}

impl WorkspaceContext {
    /// Stable JSON probe used by tests and the CLI (`get_config_info`).
    pub fn config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "config_source": match self.config_source {
                ConfigSource::Workspace => "workspace",
                ConfigSource::Default => "default",
            },
            "config_path": self.config_path.as_ref().map(|p| p.display().to_string()),
            "workspace_path": self.workspace_path.display().to_string(),
        })
    }

    /// Absolute path to the storage root (`{workspace}/{storage.path}`).
    pub fn storage_root(&self) -> PathBuf {
        self.workspace_path.join(&self.config.storage.path)
    }
}

/// Resolve a workspace context per §4.1.
pub fn resolve(origin: &WorkspaceOrigin) -> ConfigResult<WorkspaceContext> {
    let target = origin.target();
    let workspace_path = canonicalize_best_effort(&target)?;

    // Step 3: config directly in target.
    if let Some(found) = load_if_present(&workspace_path)? {
        return Ok(found);
    }

    // Step 4: ancestor search, implicit origin only.
    if !origin.is_explicit() {
        let mut current = workspace_path.parent();
        while let Some(dir) = current {
            if let Some(found) = load_if_present(dir)? {
                return Ok(found);
            }
            current = dir.parent();
        }
    }

    // Step 5-6: defaults.
    Ok(WorkspaceContext {
        workspace_path,
        config: Config::default(),
        config_source: ConfigSource::Default,
        config_path: None,
    })
}

/// Canonicalize `path`, tolerating a workspace root that does not exist yet
/// (e.g. before `init()` has run) by canonicalizing the nearest existing
/// ancestor and re-appending the missing tail.
fn canonicalize_best_effort(path: &Path) -> ConfigResult<PathBuf> {
    if let Ok(canon) = path.canonicalize() {
        return Ok(canon);
    }

    let mut existing = path;
    let mut tail = Vec::new();
    loop {
        match existing.parent() {
            Some(parent) => {
                tail.push(existing.file_name().map(PathBuf::from).unwrap_or_default());
                existing = parent;
                if let Ok(canon) = existing.canonicalize() {
                    let mut result = canon;
                    for component in tail.iter().rev() {
                        result.push(component);
                    }
                    return Ok(result);
                }
            }
            None => {
                return Err(ConfigError::InvalidPath {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "no existing ancestor directory",
                    ),
                })
            }
        }
    }
}

fn load_if_present(dir: &Path) -> ConfigResult<Option<WorkspaceContext>> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    if !candidate.is_file() {
        return Ok(None);
    }

    let text = fs::read_to_string(&candidate).map_err(|source| ConfigError::Unreadable {
        path: candidate.clone(),
        source,
    })?;

    let config = Config::from_toml_str(&text).map_err(|e| ConfigError::Malformed {
        path: candidate.clone(),
        message: e.to_string(),
    })?;

    Ok(Some(WorkspaceContext {
        workspace_path: dir.to_path_buf(),
        config,
        config_source: ConfigSource::Workspace,
        config_path: Some(candidate),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &Path, contents: &str) {
        fs::write(dir.join(CONFIG_FILE_NAME), contents).unwrap();
    }

    #[test]
    fn defaults_when_no_config_anywhere() {
        let temp = TempDir::new().unwrap();
        let origin = WorkspaceOrigin::Implicit {
            cwd: temp.path().to_path_buf(),
        };
        let ctx = resolve(&origin).unwrap();
        assert_eq!(ctx.config_source, ConfigSource::Default);
        assert!(ctx.config_path.is_none());
    }

    #[test]
    fn explicit_path_never_inherits_ancestor() {
        let parent = TempDir::new().unwrap();
        write_config(parent.path(), "[storage]\npath = \"parent_storage\"\n");

        let child = parent.path().join("child");
        fs::create_dir_all(&child).unwrap();

        let origin = WorkspaceOrigin::Explicit {
            path: child.clone(),
            cwd: parent.path().to_path_buf(),
        };
        let ctx = resolve(&origin).unwrap();

        assert_eq!(ctx.config_source, ConfigSource::Default);
        assert!(ctx.config_path.is_none());
        assert_eq!(ctx.config.storage.path, ".snapbase");
    }

    #[test]
    fn explicit_path_with_own_config_wins() {
        let parent = TempDir::new().unwrap();
        write_config(parent.path(), "[storage]\npath = \"parent_storage\"\n");

        let child = parent.path().join("child");
        fs::create_dir_all(&child).unwrap();
        write_config(&child, "[storage]\npath = \"child_storage\"\n");

        let origin = WorkspaceOrigin::Explicit {
            path: child.clone(),
            cwd: parent.path().to_path_buf(),
        };
        let ctx = resolve(&origin).unwrap();

        assert_eq!(ctx.config.storage.path, "child_storage");
        assert!(ctx
            .config_path
            .unwrap()
            .ends_with("child/snapbase.toml"));
    }

    #[test]
    fn implicit_path_inherits_nearest_ancestor() {
        let parent = TempDir::new().unwrap();
        write_config(parent.path(), "[storage]\npath = \"parent_storage\"\n");

        let child = parent.path().join("child");
        fs::create_dir_all(&child).unwrap();

        let origin = WorkspaceOrigin::Implicit {
            cwd: child.clone(),
        };
        let ctx = resolve(&origin).unwrap();

        assert_eq!(ctx.config.storage.path, "parent_storage");
        assert_eq!(ctx.config_source, ConfigSource::Workspace);
    }

    #[test]
    fn malformed_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path(), "not valid toml {{{");

        let origin = WorkspaceOrigin::Implicit {
            cwd: temp.path().to_path_buf(),
        };
        let result = resolve(&origin);
        assert!(matches!(result, Err(ConfigError::Malformed { .. })));
    }
}
