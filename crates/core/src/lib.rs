//! Backroom Core - Shared types and link rules.
//!
//! This crate provides the types used across all Backroom components:
//! - `admin` - The admin API service
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types and pure decision logic - no I/O, no
//! database access, no HTTP. Persistence and orchestration live in the
//! `admin` crate, which feeds snapshots into [`link`] and applies the
//! patches it returns.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids and structured admin names
//! - [`model`] - The `Admin` and `User` records and their field patches
//! - [`link`] - Link state representation and the link/unlink evaluator

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod link;
pub mod model;
pub mod types;

pub use link::{
    ConflictReason, LinkDecision, LinkRef, LinkState, UnlinkDecision, decide_link, decide_unlink,
    unlink_user_patch,
};
pub use model::{Admin, AdminPatch, Roles, User, UserPatch};
pub use types::*;
