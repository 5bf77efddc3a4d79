//! Role-based access policy for hosted repositories.
//!
//! This crate provides:
//!
//! - **Role / Permission**: the fixed role set and the static role → permission table
//! - **RoleAssignment**: `has_role(actor, role, resource)` facts
//! - **FactStore**: where role assignments live (in-memory or hosted)
//! - **PolicyEvaluator**: the `authorize(actor, permission, resource)` decision
//!
//! # Architecture
//!
//! ```text
//!                     ┌──────────────────────┐
//!   tell / retract ──►│      FactStore       │◄── InMemoryFactStore
//!                     └──────────┬───────────┘    OsoCloudClient
//!                                │ roles_for
//!                                ▼
//!                     ┌──────────────────────┐
//!   authorize ───────►│   PolicyEvaluator    │◄── RoleTableEvaluator
//!                     └──────────────────────┘    OsoCloudClient
//! ```
//!
//! The role table in [`Role::permissions`] is the only copy of the policy. The Polar
//! source pushed to a hosted policy service is rendered from it by
//! [`polar::render_polar`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use repo_host_policy::*;
//!
//! let facts = Arc::new(InMemoryFactStore::new());
//! let alice = ActorId::new("alice")?;
//! let repo = ResourceId::new("notes")?;
//! facts.tell(&RoleAssignment::new(alice.clone(), Role::Guest, repo.clone())).await?;
//!
//! let evaluator = RoleTableEvaluator::new(facts);
//! assert!(evaluator.authorize(&alice, Permission::DownloadFile, &repo).await?);
//! assert!(!evaluator.authorize(&alice, Permission::UploadFile, &repo).await?);
//! ```

mod error;
mod evaluator;
mod fact;
mod ids;
pub mod oso;
pub mod polar;
mod role;

pub use error::PolicyError;
pub use evaluator::{effective_permissions, PolicyEvaluator, RoleTableEvaluator};
pub use fact::{FactStore, InMemoryFactStore, RoleAssignment, HAS_ROLE};
pub use ids::{ActorId, ResourceId};
pub use oso::{OsoCloudClient, OsoCloudConfig, DEFAULT_OSO_URL};
pub use role::{Permission, PermissionSet, Role};

/// Actor type name used in facts and policies.
pub const ACTOR_TYPE: &str = "User";

/// Resource type name used in facts and policies.
pub const RESOURCE_TYPE: &str = "Repository";
