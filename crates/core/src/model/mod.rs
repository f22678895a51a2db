//! Account records.
//!
//! Admins and users are stored as independent documents. The only fields that
//! refer across the two are `Admin::user` and `User::roles.admin`; see
//! [`crate::link`] for the rules that keep them consistent.

pub mod admin;
pub mod patch;
pub mod user;

pub use admin::Admin;
pub use patch::{AdminPatch, UserPatch};
pub use user::{Roles, User};
