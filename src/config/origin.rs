//! Workspace path origin, modeled as a tagged variant rather than an
//! "is this string empty" branch at call sites (§9 Design Notes).

use std::path::PathBuf;

/// How the caller specified the workspace location.
///
/// `Implicit` may inherit an ancestor's `snapbase.toml`; `Explicit` never
/// does. Keeping this as two constructor variants, rather than branching on
/// `path.is_empty()` deep inside the resolver, makes the no-inheritance
/// invariant impossible to accidentally bypass.
#[derive(Debug, Clone)]
pub enum WorkspaceOrigin {
    /// No path was supplied (or an empty/whitespace-only string was).
    /// `cwd` is the directory to resolve against — passed in explicitly so
    /// the resolver never reads `std::env::current_dir()` itself.
    Implicit { cwd: PathBuf },

    /// A caller-supplied path, relative or absolute. Never inherits an
    /// ancestor config.
    Explicit { path: PathBuf, cwd: PathBuf },
}

impl WorkspaceOrigin {
    /// Build an origin from the raw CLI/API input and the process's current
    /// directory captured once at the call site.
    pub fn from_input(input: Option<&str>, cwd: PathBuf) -> Self {
        match input {
            None => Self::Implicit { cwd },
            Some(s) if s.trim().is_empty() => Self::Implicit { cwd },
            Some(s) => Self::Explicit {
                path: PathBuf::from(s),
                cwd,
            },
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit { .. })
    }

    /// The path to resolve and canonicalize, joined against `cwd` if relative.
    pub fn target(&self) -> PathBuf {
        match self {
            Self::Implicit { cwd } => cwd.clone(),
            Self::Explicit { path, cwd } => {
                if path.is_absolute() {
                    path.clone()
                } else {
                    cwd.join(path)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_implicit() {
        let origin = WorkspaceOrigin::from_input(Some("   "), PathBuf::from("/cwd"));
        assert!(!origin.is_explicit());
        assert_eq!(origin.target(), PathBuf::from("/cwd"));
    }

    #[test]
    fn none_is_implicit() {
        let origin = WorkspaceOrigin::from_input(None, PathBuf::from("/cwd"));
        assert!(!origin.is_explicit());
    }

    #[test]
    fn relative_path_joins_cwd() {
        let origin = WorkspaceOrigin::from_input(Some("sub/dir"), PathBuf::from("/cwd"));
        assert!(origin.is_explicit());
        assert_eq!(origin.target(), PathBuf::from("/cwd/sub/dir"));
    }

    #[test]
    fn absolute_path_ignores_cwd() {
        let origin = WorkspaceOrigin::from_input(Some("/abs/path"), PathBuf::from("/cwd"));
        assert_eq!(origin.target(), PathBuf::from("/abs/path"));
    }
}
