//! The `authorize(actor, permission, resource)` decision.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PolicyError;
use crate::fact::FactStore;
use crate::ids::{ActorId, ResourceId};
use crate::role::{Permission, PermissionSet, Role};

#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// `Ok(true)` iff one of the actor's roles on the resource grants
    /// `permission`. Backend failures are errors, never `Ok(true)`.
    async fn authorize(
        &self,
        actor: &ActorId,
        permission: Permission,
        resource: &ResourceId,
    ) -> Result<bool, PolicyError>;
}

/// Union of the permissions granted by `roles`.
pub fn effective_permissions<'a>(roles: impl IntoIterator<Item = &'a Role>) -> PermissionSet {
    roles
        .into_iter()
        .fold(PermissionSet::NONE, |acc, role| acc | role.permissions())
}

/// Local evaluator: reads the actor's roles from a [`FactStore`] and checks
/// them against the static role table.
#[derive(Clone)]
pub struct RoleTableEvaluator {
    facts: Arc<dyn FactStore>,
}

impl RoleTableEvaluator {
    pub fn new(facts: Arc<dyn FactStore>) -> Self {
        Self { facts }
    }
}

#[async_trait]
impl PolicyEvaluator for RoleTableEvaluator {
    async fn authorize(
        &self,
        actor: &ActorId,
        permission: Permission,
        resource: &ResourceId,
    ) -> Result<bool, PolicyError> {
        let roles = self.facts.roles_for(actor, resource).await?;
        let allowed = effective_permissions(&roles).allows(permission);
        tracing::debug!(
            %actor,
            %permission,
            %resource,
            roles = ?roles,
            allowed,
            "policy decision"
        );
        Ok(allowed)
    }
}
