//! The resource gateway: validate, authorize, then touch storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use repo_host_policy::{
    ActorId, FactStore, Permission, PolicyEvaluator, ResourceId, Role, RoleAssignment,
    RoleTableEvaluator,
};

use crate::error::GatewayError;
use crate::params::{
    CreateDirectoryParams, CreateRepositoryParams, DownloadFileParams, ListDirectoriesParams,
    UploadFileParams,
};
use crate::storage::{FileContents, RepoStorage};

type CreationKey = (ActorId, ResourceId);

/// One async lock per (actor, repository) currently being created.
#[derive(Clone, Default)]
struct CreationLocks {
    inner: Arc<Mutex<HashMap<CreationKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl CreationLocks {
    async fn acquire(&self, key: CreationKey) -> CreationPermit {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.clone()).or_default().clone()
        };
        CreationPermit {
            guard: Some(lock.lock_owned().await),
            locks: self.clone(),
            key,
        }
    }
}

/// Held for the whole creation saga. Dropping it (also on cancellation)
/// releases the lock and forgets the key once nobody else waits on it.
struct CreationPermit {
    guard: Option<tokio::sync::OwnedMutexGuard<()>>,
    locks: CreationLocks,
    key: CreationKey,
}

impl Drop for CreationPermit {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self
            .locks
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if map
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.key);
        }
    }
}

/// A file ready to be sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub contents: FileContents,
}

#[derive(Clone)]
pub struct ResourceGateway {
    facts: Arc<dyn FactStore>,
    evaluator: Arc<dyn PolicyEvaluator>,
    storage: Arc<dyn RepoStorage>,
    creations: CreationLocks,
}

impl ResourceGateway {
    pub fn new(
        facts: Arc<dyn FactStore>,
        evaluator: Arc<dyn PolicyEvaluator>,
        storage: Arc<dyn RepoStorage>,
    ) -> Self {
        Self {
            facts,
            evaluator,
            storage,
            creations: CreationLocks::default(),
        }
    }

    /// Gateway that evaluates against the local role table over `facts`.
    pub fn with_role_table(facts: Arc<dyn FactStore>, storage: Arc<dyn RepoStorage>) -> Self {
        let evaluator = Arc::new(RoleTableEvaluator::new(facts.clone()));
        Self::new(facts, evaluator, storage)
    }

    pub fn storage(&self) -> &Arc<dyn RepoStorage> {
        &self.storage
    }

    async fn require(
        &self,
        actor: &ActorId,
        permission: Permission,
        resource: &ResourceId,
    ) -> Result<(), GatewayError> {
        if self.evaluator.authorize(actor, permission, resource).await? {
            Ok(())
        } else {
            tracing::info!(%actor, %permission, %resource, "request denied");
            Err(GatewayError::Unauthorized {
                actor: actor.clone(),
                permission,
                resource: resource.clone(),
            })
        }
    }

    /// Record the caller as owner, then create the repository directory.
    ///
    /// If any step after the fact write fails, the fact is retracted unless
    /// the caller already owned the repository before this request.
    /// Creations of the same (actor, repository) run one at a time, so one
    /// request's rollback never removes a fact another request relies on.
    pub async fn create_repository(
        &self,
        params: CreateRepositoryParams,
    ) -> Result<String, GatewayError> {
        let request = params.validate()?;
        let (actor, repo) = (request.actor, request.repo);
        let _permit = self
            .creations
            .acquire((actor.clone(), repo.clone()))
            .await;
        let fact = RoleAssignment::owner(actor.clone(), repo.clone());

        let already_owner = self
            .facts
            .roles_for(&actor, &repo)
            .await?
            .contains(&Role::Owner);

        self.facts.tell(&fact).await?;

        match self.facts.roles_for(&actor, &repo).await {
            Ok(roles) if roles.contains(&Role::Owner) => {}
            Ok(_) => {
                self.compensate(&fact, already_owner).await;
                return Err(GatewayError::OwnerNotRecorded {
                    actor,
                    resource: repo,
                });
            }
            Err(e) => {
                self.compensate(&fact, already_owner).await;
                return Err(e.into());
            }
        }

        match self.storage.create_repository(&actor, &repo).await {
            Ok(path) => {
                tracing::info!(%actor, %repo, "repository created");
                Ok(path)
            }
            Err(e) => {
                tracing::error!(%actor, %repo, error = %e, "repository storage failed");
                self.compensate(&fact, already_owner).await;
                Err(e.into())
            }
        }
    }

    async fn compensate(&self, fact: &RoleAssignment, already_owner: bool) {
        if already_owner {
            tracing::warn!(%fact, "owner assignment predates this request, keeping it");
            return;
        }
        match self.facts.retract(fact).await {
            Ok(()) => tracing::info!(%fact, "owner assignment rolled back"),
            Err(e) => tracing::error!(%fact, error = %e, "owner assignment rollback failed"),
        }
    }

    pub async fn create_directory(
        &self,
        params: CreateDirectoryParams,
    ) -> Result<String, GatewayError> {
        let request = params.validate()?;
        self.require(&request.actor, Permission::CreateDirectory, &request.repo)
            .await?;
        Ok(self
            .storage
            .create_directory(&request.actor, &request.repo, &request.directory_path)
            .await?)
    }

    pub async fn list_directories(
        &self,
        params: ListDirectoriesParams,
    ) -> Result<Vec<String>, GatewayError> {
        let request = params.validate()?;
        self.require(&request.actor, Permission::ListDirectories, &request.repo)
            .await?;
        Ok(self
            .storage
            .list_directories(&request.actor, &request.repo, &request.directory_path)
            .await?)
    }

    pub async fn download_file(&self, params: DownloadFileParams) -> Result<Download, GatewayError> {
        let request = params.validate()?;
        self.require(&request.actor, Permission::DownloadFile, &request.repo)
            .await?;
        let contents = self
            .storage
            .read_file(&request.actor, &request.repo, &request.file_path)
            .await?;
        Ok(Download {
            file_name: request.download_file_name,
            contents,
        })
    }

    pub async fn upload_file(
        &self,
        params: UploadFileParams,
        bytes: &[u8],
    ) -> Result<String, GatewayError> {
        let request = params.validate()?;
        self.require(&request.actor, Permission::UploadFile, &request.repo)
            .await?;
        Ok(self
            .storage
            .write_file(
                &request.actor,
                &request.repo,
                &request.directory_path,
                &request.file_name,
                bytes,
                request.write_mode,
            )
            .await?)
    }
}
