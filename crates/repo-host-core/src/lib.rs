//! Typed requests, the storage port and the resource gateway.
//!
//! The [`gateway::ResourceGateway`] is the only component that composes
//! authorization with filesystem side effects. It holds its collaborators as
//! `Arc<dyn Trait>` handles so the same logic runs against the local role
//! table, a hosted policy service, or test doubles.

pub mod error;
pub mod gateway;
pub mod params;
pub mod path;
pub mod storage;

pub use error::{ErrorKind, GatewayError, ValidationError};
pub use gateway::{Download, ResourceGateway};
pub use params::{
    CreateDirectoryParams, CreateRepositoryParams, DownloadFileParams, ListDirectoriesParams,
    UploadFileParams,
};
pub use path::RepoPath;
pub use storage::{
    FileContents, LocalRepoStorage, RepoStorage, StorageError, WriteMode, DEFAULT_STORAGE_ROOT,
};
