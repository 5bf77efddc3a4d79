//! Request parameters as they arrive on the wire, and their validated forms.
//!
//! Every field is optional at the serde level so that a missing value is
//! reported as a [`ValidationError`] naming the parameter, not as a generic
//! deserialization failure.

use repo_host_policy::{ActorId, ResourceId};
use serde::Deserialize;

use crate::error::ValidationError;
use crate::storage::WriteMode;

const CURRENT_DIRECTORY: &str = ".";

fn required(name: &'static str, value: Option<String>) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::Missing(name)),
    }
}

/// Blank optional values fall back to `default`.
fn optional(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn actor(value: Option<String>) -> Result<ActorId, ValidationError> {
    let raw = required("username", value)?;
    ActorId::new(raw).map_err(|e| ValidationError::Invalid {
        name: "username",
        reason: e.to_string(),
    })
}

fn repo(value: Option<String>) -> Result<ResourceId, ValidationError> {
    let raw = required("repo_name", value)?;
    ResourceId::new(raw).map_err(|e| ValidationError::Invalid {
        name: "repo_name",
        reason: e.to_string(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRepositoryParams {
    pub username: Option<String>,
    pub repo_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepository {
    pub actor: ActorId,
    pub repo: ResourceId,
}

impl CreateRepositoryParams {
    pub fn validate(self) -> Result<CreateRepository, ValidationError> {
        Ok(CreateRepository {
            actor: actor(self.username)?,
            repo: repo(self.repo_name)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateDirectoryParams {
    pub username: Option<String>,
    pub repo_name: Option<String>,
    pub directory_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDirectory {
    pub actor: ActorId,
    pub repo: ResourceId,
    pub directory_path: String,
}

impl CreateDirectoryParams {
    pub fn validate(self) -> Result<CreateDirectory, ValidationError> {
        Ok(CreateDirectory {
            actor: actor(self.username)?,
            repo: repo(self.repo_name)?,
            directory_path: required("directory_path", self.directory_path)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListDirectoriesParams {
    pub username: Option<String>,
    pub repo_name: Option<String>,
    pub directory_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDirectories {
    pub actor: ActorId,
    pub repo: ResourceId,
    pub directory_path: String,
}

impl ListDirectoriesParams {
    pub fn validate(self) -> Result<ListDirectories, ValidationError> {
        Ok(ListDirectories {
            actor: actor(self.username)?,
            repo: repo(self.repo_name)?,
            directory_path: optional(self.directory_path, CURRENT_DIRECTORY),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadFileParams {
    pub username: Option<String>,
    pub repo_name: Option<String>,
    pub file_path: Option<String>,
    pub download_file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadFile {
    pub actor: ActorId,
    pub repo: ResourceId,
    pub file_path: String,
    pub download_file_name: String,
}

/// Last non-empty segment of `path`, treating `\` as a separator.
fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .find(|s| !s.is_empty())
        .unwrap_or(path)
}

impl DownloadFileParams {
    pub fn validate(self) -> Result<DownloadFile, ValidationError> {
        let actor = actor(self.username)?;
        let repo = repo(self.repo_name)?;
        let file_path = required("file_path", self.file_path)?;
        let default_name = last_segment(&file_path).to_string();
        Ok(DownloadFile {
            actor,
            repo,
            download_file_name: optional(self.download_file_name, &default_name),
            file_path,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadFileParams {
    pub username: Option<String>,
    pub repo_name: Option<String>,
    pub directory_path: Option<String>,
    pub file_name: Option<String>,
    pub write_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub actor: ActorId,
    pub repo: ResourceId,
    pub directory_path: String,
    pub file_name: String,
    pub write_mode: WriteMode,
}

impl UploadFileParams {
    pub fn validate(self) -> Result<UploadFile, ValidationError> {
        let actor = actor(self.username)?;
        let repo = repo(self.repo_name)?;
        let file_name = required("file_name", self.file_name)?;
        let raw_mode = optional(self.write_mode, "wb");
        let write_mode = WriteMode::parse(&raw_mode).ok_or_else(|| ValidationError::Invalid {
            name: "write_mode",
            reason: format!("'{raw_mode}' is not one of w, wb, a, ab"),
        })?;
        Ok(UploadFile {
            actor,
            repo,
            directory_path: optional(self.directory_path, CURRENT_DIRECTORY),
            file_name,
            write_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn missing_username_is_named() {
        let err = CreateRepositoryParams {
            username: None,
            repo_name: s("notes"),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing("username"));
    }

    #[test]
    fn blank_counts_as_missing() {
        let err = CreateRepositoryParams {
            username: s("user@o"),
            repo_name: s("   "),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing("repo_name"));
    }

    #[test]
    fn create_directory_requires_path() {
        let err = CreateDirectoryParams {
            username: s("user@o"),
            repo_name: s("notes"),
            directory_path: None,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing("directory_path"));
    }

    #[test]
    fn list_defaults_to_repository_root() {
        let req = ListDirectoriesParams {
            username: s("user@o"),
            repo_name: s("notes"),
            directory_path: None,
        }
        .validate()
        .unwrap();
        assert_eq!(req.directory_path, ".");
    }

    #[test]
    fn download_name_defaults_to_last_segment() {
        let req = DownloadFileParams {
            username: s("user@o"),
            repo_name: s("notes"),
            file_path: s(r"docs\2024/report.pdf"),
            download_file_name: None,
        }
        .validate()
        .unwrap();
        assert_eq!(req.download_file_name, "report.pdf");

        let named = DownloadFileParams {
            download_file_name: s("q3.pdf"),
            ..DownloadFileParams {
                username: s("user@o"),
                repo_name: s("notes"),
                file_path: s("docs/report.pdf"),
                download_file_name: None,
            }
        }
        .validate()
        .unwrap();
        assert_eq!(named.download_file_name, "q3.pdf");
    }

    #[test]
    fn upload_defaults_and_modes() {
        let base = UploadFileParams {
            username: s("user@o"),
            repo_name: s("notes"),
            directory_path: None,
            file_name: s("a.txt"),
            write_mode: None,
        };
        let req = base.clone().validate().unwrap();
        assert_eq!(req.directory_path, ".");
        assert_eq!(req.write_mode, WriteMode::Truncate);

        let append = UploadFileParams {
            write_mode: s("ab"),
            ..base.clone()
        }
        .validate()
        .unwrap();
        assert_eq!(append.write_mode, WriteMode::Append);

        let err = UploadFileParams {
            write_mode: s("r+"),
            ..base
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid { name: "write_mode", .. }));
    }

    #[test]
    fn upload_requires_file_name() {
        let err = UploadFileParams {
            username: s("user@o"),
            repo_name: s("notes"),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Missing("file_name"));
    }
}
