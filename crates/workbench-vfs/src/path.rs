//! Path normalization and sandbox resolution.
//!
//! Caller paths are posix-style strings regardless of host OS. Providers
//! speak in normalized, `/`-rooted strings; only [`SandboxRoot`] turns
//! them into host paths.

use std::path::{Path, PathBuf};

use crate::error::{FsError, FsResult};

/// Normalize a caller path to a `/`-rooted posix path.
///
/// Empty and `.` segments collapse. Any `..` segment is rejected outright
/// with `PathTraversal`; nothing is clamped.
pub fn normalize(path: &str) -> FsResult<String> {
    if path.contains('\0') {
        return Err(FsError::access_denied(format!("{path:?}: embedded NUL")));
    }
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(FsError::path_traversal(path)),
            s => segments.push(s),
        }
    }
    Ok(format!("/{}", segments.join("/")))
}

/// Normalize and strip the leading separator, ready to join onto a root.
///
/// The root itself becomes the empty string.
pub fn safe_relative(path: &str) -> FsResult<String> {
    let normalized = normalize(path)?;
    Ok(normalized.trim_start_matches('/').to_string())
}

/// Lexically resolve a path inside a filesystem that has no sandbox,
/// such as a container's own root. `..` pops a segment and stops at `/`.
pub fn resolve_lexical(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Join `name` onto `base` with posix semantics and normalize the result.
///
/// An absolute `name` replaces `base`.
pub fn join(base: &str, name: &str) -> String {
    if name.starts_with('/') {
        return resolve_lexical(name);
    }
    resolve_lexical(&format!("{base}/{name}"))
}

/// Final segment of a posix path; `/` for the root.
pub fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, name)) => name,
        None if trimmed.is_empty() => "/",
        None => trimmed,
    }
}

/// Lowercased extension of the final segment, without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = basename(path);
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext.to_lowercase()),
        _ => None,
    }
}

/// A directory that all resolved paths must stay inside.
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// The root is canonicalized when it exists so symlinked roots
    /// (e.g. macOS `/tmp` → `/private/tmp`) compare correctly.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = dunce::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a caller path to a host path strictly inside the root.
    ///
    /// Two independent checks run before any I/O on the target:
    /// normalization rejects `..`, and the joined path must carry the root
    /// as a prefix, including after resolving symlinks in its deepest
    /// existing ancestor.
    pub fn resolve(&self, path: &str) -> FsResult<PathBuf> {
        let relative = safe_relative(path)?;
        let full = if relative.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&relative)
        };

        if !full.starts_with(&self.root) {
            return Err(FsError::access_denied(format!(
                "{path}: outside workspace {}",
                self.root.display()
            )));
        }

        if let Some(real) = deepest_existing(&full) {
            let canonical_root =
                dunce::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
            if !real.starts_with(&canonical_root) {
                return Err(FsError::access_denied(format!(
                    "{path}: resolves to {} outside workspace",
                    real.display()
                )));
            }
        }

        Ok(full)
    }
}

/// Canonicalize the longest existing prefix of `path`.
fn deepest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors()
        .find_map(|ancestor| dunce::canonicalize(ancestor).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("").unwrap(), "/");
        assert_eq!(normalize("/").unwrap(), "/");
        assert_eq!(normalize("a//b/./c/").unwrap(), "/a/b/c");
        assert_eq!(normalize("/a..b/c").unwrap(), "/a..b/c");
    }

    #[test]
    fn test_normalize_rejects_parent_segments() {
        for input in ["..", "/../etc/passwd", "a/../b", "a/b/..", "./.."] {
            let err = normalize(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathTraversal, "{input}");
        }
    }

    #[test]
    fn test_safe_relative() {
        assert_eq!(safe_relative("/").unwrap(), "");
        assert_eq!(safe_relative("/src/main.rs").unwrap(), "src/main.rs");
    }

    #[test]
    fn test_join_and_basename() {
        assert_eq!(join("/", "file.txt"), "/file.txt");
        assert_eq!(join("/home/coder/", "my notes.md"), "/home/coder/my notes.md");
        assert_eq!(join("/a", "/b/c"), "/b/c");
        assert_eq!(resolve_lexical("/a/../../b"), "/b");
        assert_eq!(basename("/a/b.md"), "b.md");
        assert_eq!(basename("/a/b/"), "b");
        assert_eq!(basename("/"), "/");
        assert_eq!(extension("/x.MD").as_deref(), Some("md"));
        assert_eq!(extension("/.bashrc"), None);
        assert_eq!(extension("/Makefile"), None);
    }

    #[test]
    fn test_resolve_stays_in_root() {
        let dir = TempDir::new().unwrap();
        let root = SandboxRoot::new(dir.path());

        let resolved = root.resolve("/nested/new.txt").unwrap();
        assert!(resolved.starts_with(root.path()));
        assert_eq!(root.resolve("/").unwrap(), root.path());

        let err = root.resolve("/../../etc/passwd").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PathTraversal);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();

        let root = SandboxRoot::new(dir.path());
        let err = root.resolve("/escape/secret.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}
