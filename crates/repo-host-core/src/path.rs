//! Request path hardening.
//!
//! Every path that reaches the filesystem is first parsed into a
//! [`RepoPath`]: a list of plain segments with no parent references, no root
//! and no drive prefix. Backslashes are treated as separators and `.`
//! segments are dropped, so `a\.\b` and `a/b` name the same location.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::storage::StorageError;

fn invalid(path: &str, reason: impl Into<String>) -> StorageError {
    StorageError::InvalidPath {
        path: path.to_string(),
        reason: reason.into(),
    }
}

/// Check that `raw` is usable as one path segment (a user directory, a
/// repository directory or a file name).
pub fn single_segment(raw: &str) -> Result<&str, StorageError> {
    if raw.is_empty() || raw == "." || raw == ".." {
        return Err(invalid(raw, "not a usable name"));
    }
    if raw.contains(['/', '\\', '\0']) {
        return Err(invalid(raw, "must be a single path segment"));
    }
    let mut components = Path::new(raw).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(raw),
        _ => Err(invalid(raw, "must be a single path segment")),
    }
}

/// A validated location relative to a repository directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    /// The repository directory itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        if raw.contains('\0') {
            return Err(invalid(raw, "contains a NUL byte"));
        }
        let normalized = raw.replace('\\', "/");
        if normalized.starts_with('/') {
            return Err(invalid(raw, "absolute paths are not allowed"));
        }

        let mut segments = Vec::new();
        for segment in normalized.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(invalid(raw, "parent segments are not allowed")),
                _ => {}
            }
            // Catches drive and UNC prefixes on platforms that have them.
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => segments.push(segment.to_string()),
                _ => return Err(invalid(raw, "must be relative to the repository")),
            }
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Append one validated segment.
    pub fn join(&self, name: &str) -> Result<Self, StorageError> {
        let name = single_segment(name)?;
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Ok(Self { segments })
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.segments.iter().collect()
    }

    /// `repo` followed by this path, `/`-separated. Used for responses.
    pub fn display_under(&self, repo: &str) -> String {
        if self.is_root() {
            repo.to_string()
        } else {
            format!("{repo}/{self}")
        }
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str(".")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}
