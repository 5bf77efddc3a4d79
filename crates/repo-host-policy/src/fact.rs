//! Role-assignment facts and the stores that hold them.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::PolicyError;
use crate::ids::{ActorId, ResourceId};
use crate::role::Role;
use crate::{ACTOR_TYPE, RESOURCE_TYPE};

/// Relation name of a role-assignment fact.
pub const HAS_ROLE: &str = "has_role";

/// `has_role(actor, role, resource)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub actor: ActorId,
    pub role: Role,
    pub resource: ResourceId,
}

impl RoleAssignment {
    pub fn new(actor: ActorId, role: Role, resource: ResourceId) -> Self {
        Self {
            actor,
            role,
            resource,
        }
    }

    /// The assignment recorded for the creator of a repository.
    pub fn owner(actor: ActorId, resource: ResourceId) -> Self {
        Self::new(actor, Role::Owner, resource)
    }
}

impl fmt::Display for RoleAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{HAS_ROLE}({ACTOR_TYPE}:{}, {}, {RESOURCE_TYPE}:{})",
            self.actor, self.role, self.resource
        )
    }
}

/// Storage for role-assignment facts.
///
/// `tell` and `retract` must be idempotent or return an error; they never
/// silently drop a write. `roles_for` must observe a `tell` that has
/// already returned.
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Record a fact.
    async fn tell(&self, fact: &RoleAssignment) -> Result<(), PolicyError>;

    /// Remove a fact. Only used to compensate a failed repository creation.
    async fn retract(&self, fact: &RoleAssignment) -> Result<(), PolicyError>;

    /// All roles `actor` holds on `resource`.
    async fn roles_for(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
    ) -> Result<BTreeSet<Role>, PolicyError>;
}

/// Process-local fact store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFactStore {
    facts: Arc<RwLock<BTreeSet<RoleAssignment>>>,
}

impl InMemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facts(facts: impl IntoIterator<Item = RoleAssignment>) -> Self {
        Self {
            facts: Arc::new(RwLock::new(facts.into_iter().collect())),
        }
    }

    /// Every fact currently held, in sorted order.
    pub async fn snapshot(&self) -> Vec<RoleAssignment> {
        self.facts.read().await.iter().cloned().collect()
    }

    /// Every fact about `resource`, regardless of actor.
    pub async fn facts_on(&self, resource: &ResourceId) -> Vec<RoleAssignment> {
        self.facts
            .read()
            .await
            .iter()
            .filter(|f| &f.resource == resource)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.facts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.facts.read().await.is_empty()
    }
}

#[async_trait]
impl FactStore for InMemoryFactStore {
    async fn tell(&self, fact: &RoleAssignment) -> Result<(), PolicyError> {
        let inserted = self.facts.write().await.insert(fact.clone());
        tracing::debug!(%fact, inserted, "tell");
        Ok(())
    }

    async fn retract(&self, fact: &RoleAssignment) -> Result<(), PolicyError> {
        let removed = self.facts.write().await.remove(fact);
        tracing::debug!(%fact, removed, "retract");
        Ok(())
    }

    async fn roles_for(
        &self,
        actor: &ActorId,
        resource: &ResourceId,
    ) -> Result<BTreeSet<Role>, PolicyError> {
        let facts = self.facts.read().await;
        Ok(facts
            .iter()
            .filter(|f| &f.actor == actor && &f.resource == resource)
            .map(|f| f.role)
            .collect())
    }
}
