//! Business logic services for admin.
//!
//! # Services
//!
//! - `link` - Admin/user link orchestration
//! - `locks` - Per-record lock table shared by link writers

pub mod link;
pub mod locks;

pub use link::{LinkError, LinkOutcome, LinkService, RecordKind, WriteFailure};
pub use locks::{AdminGuard, LinkLocks, UserGuard};
