//! Roles, permissions and the static role → permission table.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::PolicyError;

/// A role an actor can hold on a repository.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Owner,
    Admin,
    Guest,
}

/// A single operation type checked at evaluation time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Permission {
    ListDirectories,
    CreateDirectory,
    DownloadFile,
    UploadFile,
}

bitflags! {
    /// A set of permissions, as granted by one or more roles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermissionSet: u8 {
        const LIST_DIRECTORIES = 1 << 0;
        const CREATE_DIRECTORY = 1 << 1;
        const DOWNLOAD_FILE = 1 << 2;
        const UPLOAD_FILE = 1 << 3;

        /// No permissions.
        const NONE = 0;

        /// Browse and fetch, no writes.
        const READ = Self::LIST_DIRECTORIES.bits() | Self::DOWNLOAD_FILE.bits();

        /// Every repository permission.
        const FULL = Self::READ.bits()
            | Self::CREATE_DIRECTORY.bits()
            | Self::UPLOAD_FILE.bits();
    }
}

impl Role {
    /// The role → permission table. This is the only place it is defined.
    pub fn permissions(self) -> PermissionSet {
        match self {
            Role::Owner => PermissionSet::FULL,
            Role::Admin => PermissionSet::FULL,
            Role::Guest => PermissionSet::READ,
        }
    }

    pub fn grants(self, permission: Permission) -> bool {
        self.permissions().allows(permission)
    }

    pub fn parse(name: &str) -> Result<Self, PolicyError> {
        name.parse()
            .map_err(|_| PolicyError::UnknownRole(name.to_string()))
    }

    pub fn all() -> impl Iterator<Item = Role> {
        Role::iter()
    }
}

impl Permission {
    pub fn flag(self) -> PermissionSet {
        match self {
            Permission::ListDirectories => PermissionSet::LIST_DIRECTORIES,
            Permission::CreateDirectory => PermissionSet::CREATE_DIRECTORY,
            Permission::DownloadFile => PermissionSet::DOWNLOAD_FILE,
            Permission::UploadFile => PermissionSet::UPLOAD_FILE,
        }
    }

    pub fn all() -> impl Iterator<Item = Permission> {
        Permission::iter()
    }
}

impl PermissionSet {
    pub fn allows(&self, permission: Permission) -> bool {
        self.contains(permission.flag())
    }

    /// The individual permissions in this set, in declaration order.
    pub fn to_vec(&self) -> Vec<Permission> {
        Permission::all().filter(|p| self.allows(*p)).collect()
    }
}

impl Default for PermissionSet {
    fn default() -> Self {
        PermissionSet::NONE
    }
}
