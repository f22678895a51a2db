//! User record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::link::LinkState;
use crate::types::{AdminId, UserId};

/// Role descriptors held by a user.
///
/// Only the `admin` role takes part in linking. Any other role entries are
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    /// The linked admin, if any.
    #[serde(default, skip_serializing_if = "LinkState::is_unlinked")]
    pub admin: LinkState<AdminId>,
    /// Other roles, opaque to this crate.
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_json::Value>,
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique, stable user id.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Roles keyed by role name.
    #[serde(default)]
    pub roles: Roles,
    /// Optimistic concurrency token, bumped on every stored update.
    pub version: i64,
    /// When the user was created.
    pub time_created: DateTime<Utc>,
}

impl User {
    /// A fresh user with no roles at version 1.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, time_created: DateTime<Utc>) -> Self {
        Self {
            id,
            username: username.into(),
            roles: Roles::default(),
            version: 1,
            time_created,
        }
    }
}
