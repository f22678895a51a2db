//! Admin record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::link::LinkState;
use crate::types::{AdminId, AdminName, UserId};

/// An admin account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    /// Unique, stable admin id.
    pub id: AdminId,
    /// Structured name.
    pub name: AdminName,
    /// Named permission flags.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
    /// Group memberships, keyed by group id with a display label.
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
    /// The linked user, if any.
    #[serde(default, skip_serializing_if = "LinkState::is_unlinked")]
    pub user: LinkState<UserId>,
    /// Optimistic concurrency token, bumped on every stored update.
    pub version: i64,
    /// When the admin was created.
    pub time_created: DateTime<Utc>,
}

impl Admin {
    /// A fresh, unlinked admin at version 1.
    #[must_use]
    pub fn new(id: AdminId, name: AdminName, time_created: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            permissions: BTreeMap::new(),
            groups: BTreeMap::new(),
            user: LinkState::Unlinked,
            version: 1,
            time_created,
        }
    }
}
