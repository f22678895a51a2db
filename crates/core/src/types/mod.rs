//! Core types for Backroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod name;

pub use id::*;
pub use name::{AdminName, NameError};
