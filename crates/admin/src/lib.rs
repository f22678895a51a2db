//! Backroom Admin library.
//!
//! This crate provides the admin service as a library, allowing it to be
//! tested and reused.
//!
//! # Modules
//!
//! - `config` - Environment configuration
//! - `db` - Account store trait and its `PostgreSQL` / in-memory backends
//! - `services` - Admin/user link orchestration and record locks
//! - `routes` - axum handlers under `/api`
//!
//! Request authentication is handled in front of this service.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;
