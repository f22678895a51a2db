//! Pure link/unlink decisions.
//!
//! Both directions of the relation are checked before any write is planned,
//! so a caller never starts a link that one side would refuse.

use crate::link::LinkRef;
use crate::model::{Admin, AdminPatch, User, UserPatch};
use crate::types::UserId;

/// Why a link request was refused.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictReason {
    /// The user's `admin` role already references an admin.
    #[error("user already linked to an admin")]
    UserAlreadyLinked,
    /// The admin already references a user.
    #[error("admin already linked to a user")]
    AdminAlreadyLinked,
}

/// Outcome of evaluating a link request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDecision {
    /// Apply both patches.
    Proceed {
        /// Patch for the admin record.
        admin: AdminPatch,
        /// Patch for the user record.
        user: UserPatch,
    },
    /// Refuse without writing.
    Conflict(ConflictReason),
}

/// Outcome of evaluating an unlink request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnlinkDecision {
    /// Nothing is linked; no reads or writes are needed.
    NoOp,
    /// Clear the admin's reference and the referenced user's role.
    ///
    /// The user must be fetched first; build its patch with
    /// [`unlink_user_patch`].
    Proceed {
        /// The user the admin points at.
        user_id: UserId,
        /// Patch for the admin record.
        admin: AdminPatch,
    },
}

/// Decide whether `admin` may be linked to `user`.
///
/// The user side is checked first. An existing link is always a conflict,
/// even when it already joins this exact pair; callers must unlink first.
/// A dangling half-reference on either side does not block the link and is
/// overwritten.
#[must_use]
pub fn decide_link(admin: &Admin, user: &User) -> LinkDecision {
    if user.roles.admin.is_linked() {
        return LinkDecision::Conflict(ConflictReason::UserAlreadyLinked);
    }
    if admin.user.is_linked() {
        return LinkDecision::Conflict(ConflictReason::AdminAlreadyLinked);
    }

    LinkDecision::Proceed {
        admin: AdminPatch::link_user(LinkRef::new(user.id.clone(), user.username.clone()))
            .guarded(admin.version),
        user: UserPatch::link_admin(LinkRef::new(admin.id.clone(), admin.name.full()))
            .guarded(user.version),
    }
}

/// Decide what unlinking `admin` requires.
///
/// An admin with no user reference, or with a reference that has no id, is
/// already unlinked.
#[must_use]
pub fn decide_unlink(admin: &Admin) -> UnlinkDecision {
    match admin.user.peer_id() {
        None => UnlinkDecision::NoOp,
        Some(user_id) => UnlinkDecision::Proceed {
            user_id: user_id.clone(),
            admin: AdminPatch::clear_user().guarded(admin.version),
        },
    }
}

/// Patch that clears `user`'s `admin` role as part of an unlink.
#[must_use]
pub fn unlink_user_patch(user: &User) -> UserPatch {
    UserPatch::clear_admin().guarded(user.version)
}
