//! Workspace root that confines tool paths.

use crate::{Result, ToolError};
use std::path::{Component, Path, PathBuf};

/// The directory tools operate in.
///
/// Every path handed to a tool is resolved against the root. Paths that
/// would leave the root (through `..`, an unrelated absolute path or a
/// symlink pointing elsewhere) are rejected.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path. An empty path means the root itself.
    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let requested = Path::new(path);
        let relative = if requested.is_absolute() {
            requested
                .strip_prefix(&self.root)
                .map_err(|_| ToolError::OutsideWorkspace(path.to_string()))?
        } else {
            requested
        };

        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(ToolError::OutsideWorkspace(path.to_string()));
                    }
                    resolved.pop();
                    depth -= 1;
                }
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ToolError::OutsideWorkspace(path.to_string()));
                }
            }
        }
        self.confine(&resolved, path)?;
        Ok(resolved)
    }

    /// Check that the nearest existing ancestor of `resolved` really lives
    /// under the root once symlinks are followed.
    fn confine(&self, resolved: &Path, requested: &str) -> Result<()> {
        let root = dunce::canonicalize(&self.root)
            .map_err(|e| ToolError::io(self.root.display().to_string(), e))?;
        let Some(existing) = resolved
            .ancestors()
            .find(|p| p.symlink_metadata().is_ok())
        else {
            return Err(ToolError::OutsideWorkspace(requested.to_string()));
        };
        // A dangling symlink fails here too.
        let real = dunce::canonicalize(existing)
            .map_err(|_| ToolError::OutsideWorkspace(requested.to_string()))?;
        if real.starts_with(&root) {
            Ok(())
        } else {
            Err(ToolError::OutsideWorkspace(requested.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_paths_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert_eq!(ws.resolve("src/main.rs").unwrap(), dir.path().join("src/main.rs"));
        assert_eq!(ws.resolve("./a/../b").unwrap(), dir.path().join("b"));
        assert_eq!(ws.resolve("").unwrap(), dir.path().to_path_buf());
        assert_eq!(ws.resolve(".").unwrap(), dir.path().to_path_buf());
    }

    #[test]
    fn rejects_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        assert!(matches!(ws.resolve("../etc"), Err(ToolError::OutsideWorkspace(_))));
        assert!(matches!(ws.resolve("a/../../x"), Err(ToolError::OutsideWorkspace(_))));
        assert!(matches!(ws.resolve("/etc/passwd"), Err(ToolError::OutsideWorkspace(_))));
    }

    #[test]
    fn accepts_absolute_paths_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path());
        let inside = dir.path().join("notes.md");
        assert_eq!(ws.resolve(inside.to_str().unwrap()).unwrap(), inside);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::new(dir.path().join("gone"));
        assert!(matches!(ws.resolve("a.txt"), Err(ToolError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_out_of_the_root_are_rejected() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), "top secret").unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("missing.txt"),
            dir.path().join("dangling"),
        )
        .unwrap();

        let ws = Workspace::new(dir.path());
        for path in ["link/secret.txt", "link", "link/new.txt", "dangling"] {
            assert!(
                matches!(ws.resolve(path), Err(ToolError::OutsideWorkspace(_))),
                "{path}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_within_the_root_are_followed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();

        let ws = Workspace::new(dir.path());
        assert_eq!(ws.resolve("alias/a.txt").unwrap(), dir.path().join("alias/a.txt"));
    }
}
