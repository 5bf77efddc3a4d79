use repo_host_policy::{ActorId, Permission, PolicyError, ResourceId};
use thiserror::Error;

use crate::storage::StorageError;

/// A request parameter was missing or malformed. Raised before any
/// collaborator is called.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' must be provided in the request")]
    Missing(&'static str),

    #[error("invalid '{name}': {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("'{actor}' is not permitted to {permission} on '{resource}'")]
    Unauthorized {
        actor: ActorId,
        permission: Permission,
        resource: ResourceId,
    },

    #[error("owner assignment for '{actor}' on '{resource}' not observable after write")]
    OwnerNotRecorded { actor: ActorId, resource: ResourceId },

    #[error("policy backend: {0}")]
    Policy(#[from] PolicyError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

/// How a failure is reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad request shape; nothing was attempted.
    Validation,
    /// Permission denied; nothing was attempted.
    Authorization,
    /// The requested path does not exist.
    NotFound,
    /// Fact store, evaluator or storage failed.
    Collaborator,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::NotFound => "not_found",
            Self::Collaborator => "collaborator",
        }
    }
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::Policy(e) if !e.is_backend_failure() => ErrorKind::Validation,
            Self::Storage(StorageError::InvalidPath { .. }) => ErrorKind::Validation,
            Self::Storage(StorageError::NotFound(_)) => ErrorKind::NotFound,
            Self::OwnerNotRecorded { .. } | Self::Policy(_) | Self::Storage(_) => {
                ErrorKind::Collaborator
            }
        }
    }

    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Collaborator => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unauthorized() -> GatewayError {
        GatewayError::Unauthorized {
            actor: ActorId::new("user@g").unwrap(),
            permission: Permission::UploadFile,
            resource: ResourceId::new("r1").unwrap(),
        }
    }

    #[test]
    fn http_status_validation() {
        let e = GatewayError::from(ValidationError::Missing("repo_name"));
        assert_eq!(e.http_status(), 400);
        assert_eq!(e.to_string(), "'repo_name' must be provided in the request");
    }

    #[test]
    fn http_status_unauthorized() {
        let e = unauthorized();
        assert_eq!(e.kind(), ErrorKind::Authorization);
        assert_eq!(e.http_status(), 401);
        assert_eq!(
            e.to_string(),
            "'user@g' is not permitted to upload_file on 'r1'"
        );
    }

    #[test]
    fn http_status_policy_unavailable() {
        let e = GatewayError::from(PolicyError::Unavailable("timeout".into()));
        assert_eq!(e.kind(), ErrorKind::Collaborator);
        assert_eq!(e.http_status(), 500);
    }

    #[test]
    fn http_status_storage() {
        let invalid = GatewayError::from(StorageError::InvalidPath {
            path: "../x".into(),
            reason: "parent segments are not allowed".into(),
        });
        assert_eq!(invalid.http_status(), 400);

        let missing = GatewayError::from(StorageError::NotFound("r1/a.txt".into()));
        assert_eq!(missing.http_status(), 404);

        let io = GatewayError::from(StorageError::Io(std::io::Error::other("disk full")));
        assert_eq!(io.http_status(), 500);
    }

    #[test]
    fn kind_names() {
        assert_eq!(ErrorKind::Validation.as_str(), "validation");
        assert_eq!(unauthorized().kind().as_str(), "authorization");
        assert_eq!(ErrorKind::Collaborator.as_str(), "collaborator");
    }
}
