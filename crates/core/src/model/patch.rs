//! Field-level patches for stored records.
//!
//! A patch names the fields to overwrite; `None` leaves a field alone. When
//! `expected_version` is set, the store must reject the write if the record's
//! version no longer matches.

use std::collections::BTreeMap;

use crate::link::{LinkRef, LinkState};
use crate::model::{Admin, User};
use crate::types::{AdminId, AdminName, UserId};

/// Changes to apply to an [`Admin`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminPatch {
    /// Version the record must still have for the write to succeed.
    pub expected_version: Option<i64>,
    /// New name.
    pub name: Option<AdminName>,
    /// Replacement permission set.
    pub permissions: Option<BTreeMap<String, bool>>,
    /// Replacement group set.
    pub groups: Option<BTreeMap<String, String>>,
    /// New linked-user state.
    pub user: Option<LinkState<UserId>>,
}

impl AdminPatch {
    /// Require the record to still be at `version`.
    #[must_use]
    pub fn guarded(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Patch that replaces the name.
    #[must_use]
    pub fn name(name: AdminName) -> Self {
        Self {
            name: Some(name),
            ..Self::default()
        }
    }

    /// Patch that replaces the permission set.
    #[must_use]
    pub fn permissions(permissions: BTreeMap<String, bool>) -> Self {
        Self {
            permissions: Some(permissions),
            ..Self::default()
        }
    }

    /// Patch that replaces the group set.
    #[must_use]
    pub fn groups(groups: BTreeMap<String, String>) -> Self {
        Self {
            groups: Some(groups),
            ..Self::default()
        }
    }

    /// Patch that points the admin at a user.
    #[must_use]
    pub fn link_user(link: LinkRef<UserId>) -> Self {
        Self {
            user: Some(LinkState::Linked(link)),
            ..Self::default()
        }
    }

    /// Patch that removes the user reference entirely.
    #[must_use]
    pub fn clear_user() -> Self {
        Self {
            user: Some(LinkState::Unlinked),
            ..Self::default()
        }
    }

    /// Whether the patch touches the link field.
    #[must_use]
    pub const fn touches_link(&self) -> bool {
        self.user.is_some()
    }

    /// Apply the field changes to `admin`. Does not check or bump the version.
    pub fn apply(&self, admin: &mut Admin) {
        if let Some(name) = &self.name {
            admin.name.clone_from(name);
        }
        if let Some(permissions) = &self.permissions {
            admin.permissions.clone_from(permissions);
        }
        if let Some(groups) = &self.groups {
            admin.groups.clone_from(groups);
        }
        if let Some(user) = &self.user {
            admin.user.clone_from(user);
        }
    }
}

/// Changes to apply to a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    /// Version the record must still have for the write to succeed.
    pub expected_version: Option<i64>,
    /// New state of the `admin` role.
    pub admin_role: Option<LinkState<AdminId>>,
}

impl UserPatch {
    /// Require the record to still be at `version`.
    #[must_use]
    pub fn guarded(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Patch that grants the `admin` role pointing at an admin.
    #[must_use]
    pub fn link_admin(link: LinkRef<AdminId>) -> Self {
        Self {
            admin_role: Some(LinkState::Linked(link)),
            ..Self::default()
        }
    }

    /// Patch that removes the `admin` role entirely.
    #[must_use]
    pub fn clear_admin() -> Self {
        Self {
            admin_role: Some(LinkState::Unlinked),
            ..Self::default()
        }
    }

    /// Apply the field changes to `user`. Does not check or bump the version.
    pub fn apply(&self, user: &mut User) {
        if let Some(admin_role) = &self.admin_role {
            user.roles.admin.clone_from(admin_role);
        }
    }
}
