//! Repository storage abstraction.
//!
//! Repositories live at `<root>/<actor>/<repo>/`. The storage layer never
//! decides who may do what; it only refuses paths that would escape the
//! repository directory.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use repo_host_policy::{ActorId, ResourceId};
use tokio::io::AsyncWriteExt;

use crate::path::{single_segment, RepoPath};

/// Storage directory used when none is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "repo-host-root";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("not found: {0}")]
    NotFound(String),
}

/// How an upload treats an existing file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    #[default]
    Truncate,
    Append,
}

impl WriteMode {
    /// Parse the `w`/`wb`/`a`/`ab` mode strings accepted on the wire.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "w" | "wb" => Some(Self::Truncate),
            "a" | "ab" => Some(Self::Append),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContents {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait RepoStorage: Send + Sync {
    /// Prepare the storage root. Called once at startup.
    async fn init(&self) -> Result<(), StorageError>;

    /// Create the repository directory, returning `repo`.
    async fn create_repository(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
    ) -> Result<String, StorageError>;

    /// Create `path` (and missing parents), returning `repo/path`.
    async fn create_directory(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<String, StorageError>;

    /// Immediate subdirectories of `path` as sorted `repo/path/name` entries.
    async fn list_directories(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<Vec<String>, StorageError>;

    async fn read_file(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<FileContents, StorageError>;

    /// Write `bytes` to `directory/file_name`, returning `repo/directory/file_name`.
    async fn write_file(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        directory: &str,
        file_name: &str,
        bytes: &[u8],
        mode: WriteMode,
    ) -> Result<String, StorageError>;
}

/// Guess a content type from the file name.
pub fn content_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Local filesystem implementation.
#[derive(Debug, Clone)]
pub struct LocalRepoStorage {
    base_path: PathBuf,
}

impl LocalRepoStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Repository-relative segments below `<root>/<actor>/<repo>`, validated
    /// and checked for symlinks along the existing prefix.
    async fn resolve(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &RepoPath,
    ) -> Result<PathBuf, StorageError> {
        let mut current = self.base_path.clone();
        let prefix = [
            single_segment(actor.as_str())?,
            single_segment(repo.as_str())?,
        ];

        for segment in prefix.into_iter().chain(path.segments()) {
            current.push(segment);
            match tokio::fs::symlink_metadata(&current).await {
                Ok(meta) if meta.file_type().is_symlink() => {
                    return Err(StorageError::InvalidPath {
                        path: path.display_under(repo.as_str()),
                        reason: "symbolic links are not followed".to_string(),
                    });
                }
                Ok(_) => {}
                // Nothing further down can be a link either.
                Err(e) if e.kind() == IoErrorKind::NotFound => {
                    return Ok(self.full_path(actor, repo, path));
                }
                Err(e) => return Err(classify_io(e, &path.display_under(repo.as_str()))),
            }
        }
        Ok(current)
    }

    fn full_path(&self, actor: &ActorId, repo: &ResourceId, path: &RepoPath) -> PathBuf {
        self.base_path
            .join(actor.as_str())
            .join(repo.as_str())
            .join(path.to_path_buf())
    }

    async fn repository_dir(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.resolve(actor, repo, &RepoPath::root()).await?;
        if !is_dir(&dir).await {
            return Err(StorageError::NotFound(repo.to_string()));
        }
        Ok(dir)
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// Errors caused by the shape of the request path are the caller's, not ours.
fn classify_io(e: std::io::Error, shown: &str) -> StorageError {
    let reason = match e.kind() {
        IoErrorKind::NotFound => return StorageError::NotFound(shown.to_string()),
        IoErrorKind::NotADirectory => "a path segment is a file",
        IoErrorKind::IsADirectory => "is a directory",
        IoErrorKind::AlreadyExists => "already exists as a file",
        _ => return StorageError::Io(e),
    };
    StorageError::InvalidPath {
        path: shown.to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_path(shown: &str, reason: &str) -> StorageError {
    StorageError::InvalidPath {
        path: shown.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl RepoStorage for LocalRepoStorage {
    async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        tracing::info!(root = %self.base_path.display(), "storage root ready");
        Ok(())
    }

    async fn create_repository(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
    ) -> Result<String, StorageError> {
        let dir = self.resolve(actor, repo, &RepoPath::root()).await?;
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(%actor, %repo, "repository directory created");
        Ok(repo.to_string())
    }

    async fn create_directory(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<String, StorageError> {
        let path = RepoPath::parse(path)?;
        let shown = path.display_under(repo.as_str());
        self.repository_dir(actor, repo).await?;
        let dir = self.resolve(actor, repo, &path).await?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| classify_io(e, &shown))?;
        Ok(shown)
    }

    async fn list_directories(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<Vec<String>, StorageError> {
        let path = RepoPath::parse(path)?;
        self.repository_dir(actor, repo).await?;
        let dir = self.resolve(actor, repo, &path).await?;
        let shown = path.display_under(repo.as_str());
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if !meta.is_dir() => return Err(invalid_path(&shown, "not a directory")),
            Ok(_) => {}
            Err(e) => return Err(classify_io(e, &shown)),
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| classify_io(e, &shown))?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // `file_type` does not follow links, so linked directories are skipped.
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names
            .into_iter()
            .map(|name| format!("{shown}/{name}"))
            .collect())
    }

    async fn read_file(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        path: &str,
    ) -> Result<FileContents, StorageError> {
        let path = RepoPath::parse(path)?;
        let shown = path.display_under(repo.as_str());
        let Some(name) = path.file_name() else {
            return Err(StorageError::InvalidPath {
                path: shown,
                reason: "a file path is required".to_string(),
            });
        };
        let file = self.resolve(actor, repo, &path).await?;
        if is_dir(&file).await {
            return Err(invalid_path(&shown, "is a directory"));
        }

        let bytes = tokio::fs::read(&file)
            .await
            .map_err(|e| classify_io(e, &shown))?;
        Ok(FileContents {
            bytes,
            content_type: content_type_for(name),
        })
    }

    async fn write_file(
        &self,
        actor: &ActorId,
        repo: &ResourceId,
        directory: &str,
        file_name: &str,
        bytes: &[u8],
        mode: WriteMode,
    ) -> Result<String, StorageError> {
        let path = RepoPath::parse(directory)?.join(file_name)?;
        let shown = path.display_under(repo.as_str());
        self.repository_dir(actor, repo).await?;
        let file = self.resolve(actor, repo, &path).await?;

        if is_dir(&file).await {
            return Err(invalid_path(&shown, "is a directory"));
        }
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| classify_io(e, &shown))?;
        }

        let mut options = tokio::fs::OpenOptions::new();
        options.create(true);
        match mode {
            WriteMode::Truncate => options.write(true).truncate(true),
            WriteMode::Append => options.append(true),
        };
        let mut handle = options
            .open(&file)
            .await
            .map_err(|e| classify_io(e, &shown))?;
        handle.write_all(bytes).await?;
        handle.flush().await?;

        tracing::debug!(%actor, %repo, path = %shown, bytes = bytes.len(), ?mode, "file written");
        Ok(shown)
    }
}

/// In-memory storage (for testing)
#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::BTreeMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct InMemoryRepoStorage {
        repos: RwLock<BTreeMap<(String, String), BTreeMap<String, Vec<u8>>>>,
    }

    impl InMemoryRepoStorage {
        pub async fn has_repository(&self, actor: &str, repo: &str) -> bool {
            self.repos
                .read()
                .await
                .contains_key(&(actor.to_string(), repo.to_string()))
        }
    }

    fn key(actor: &ActorId, repo: &ResourceId) -> (String, String) {
        (actor.to_string(), repo.to_string())
    }

    #[async_trait]
    impl RepoStorage for InMemoryRepoStorage {
        async fn init(&self) -> Result<(), StorageError> {
            Ok(())
        }

        async fn create_repository(
            &self,
            actor: &ActorId,
            repo: &ResourceId,
        ) -> Result<String, StorageError> {
            self.repos.write().await.entry(key(actor, repo)).or_default();
            Ok(repo.to_string())
        }

        async fn create_directory(
            &self,
            actor: &ActorId,
            repo: &ResourceId,
            path: &str,
        ) -> Result<String, StorageError> {
            let path = RepoPath::parse(path)?;
            let mut repos = self.repos.write().await;
            let files = repos
                .get_mut(&key(actor, repo))
                .ok_or_else(|| StorageError::NotFound(repo.to_string()))?;
            files.entry(format!("{path}/")).or_default();
            Ok(path.display_under(repo.as_str()))
        }

        async fn list_directories(
            &self,
            actor: &ActorId,
            repo: &ResourceId,
            path: &str,
        ) -> Result<Vec<String>, StorageError> {
            let path = RepoPath::parse(path)?;
            let repos = self.repos.read().await;
            let files = repos
                .get(&key(actor, repo))
                .ok_or_else(|| StorageError::NotFound(repo.to_string()))?;
            let prefix = if path.is_root() {
                String::new()
            } else {
                format!("{path}/")
            };
            Ok(files
                .keys()
                .filter_map(|k| k.strip_prefix(&prefix)?.strip_suffix('/'))
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(|name| format!("{}/{name}", path.display_under(repo.as_str())))
                .collect())
        }

        async fn read_file(
            &self,
            actor: &ActorId,
            repo: &ResourceId,
            path: &str,
        ) -> Result<FileContents, StorageError> {
            let path = RepoPath::parse(path)?;
            let repos = self.repos.read().await;
            let bytes = repos
                .get(&key(actor, repo))
                .and_then(|files| files.get(&path.to_string()))
                .cloned()
                .ok_or_else(|| StorageError::NotFound(path.display_under(repo.as_str())))?;
            Ok(FileContents {
                bytes,
                content_type: content_type_for(path.file_name().unwrap_or_default()),
            })
        }

        async fn write_file(
            &self,
            actor: &ActorId,
            repo: &ResourceId,
            directory: &str,
            file_name: &str,
            bytes: &[u8],
            mode: WriteMode,
        ) -> Result<String, StorageError> {
            let path = RepoPath::parse(directory)?.join(file_name)?;
            let mut repos = self.repos.write().await;
            let files = repos
                .get_mut(&key(actor, repo))
                .ok_or_else(|| StorageError::NotFound(repo.to_string()))?;
            let entry = files.entry(path.to_string()).or_default();
            if mode == WriteMode::Truncate {
                entry.clear();
            }
            entry.extend_from_slice(bytes);
            Ok(path.display_under(repo.as_str()))
        }
    }
}
