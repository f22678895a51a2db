//! Admin/user link rules.
//!
//! An admin and a user are linked when `admin.user.id == user.id` and
//! `user.roles.admin.id == admin.id`. The relation is at most one-to-one, and
//! the two halves live in separate documents with no shared transaction. The
//! evaluator in this module decides, from snapshots alone, whether a link or
//! unlink may proceed and which patches realize it.

pub mod evaluator;
pub mod state;

pub use evaluator::{
    ConflictReason, LinkDecision, UnlinkDecision, decide_link, decide_unlink, unlink_user_patch,
};
pub use state::{LinkRef, LinkState};
