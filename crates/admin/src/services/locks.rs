//! Per-record async locks for link writers.
//!
//! Admin locks are always taken before user locks, and a user lock can only
//! be requested while holding an admin guard, so two writers never wait on
//! each other in opposite order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use backroom_core::{AdminId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Admin(AdminId),
    User(UserId),
}

/// Lock table keyed by record kind and id.
///
/// Entries nobody holds or waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct LinkLocks {
    table: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one admin record.
#[derive(Debug)]
pub struct AdminGuard {
    admin_id: AdminId,
    _guard: OwnedMutexGuard<()>,
}

impl AdminGuard {
    #[must_use]
    pub const fn admin_id(&self) -> &AdminId {
        &self.admin_id
    }
}

/// Exclusive hold on one user record, nested inside an [`AdminGuard`].
#[derive(Debug)]
pub struct UserGuard<'a> {
    _admin: &'a AdminGuard,
    _guard: OwnedMutexGuard<()>,
}

impl LinkLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<LockKey, Arc<AsyncMutex<()>>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, key: LockKey) -> Arc<AsyncMutex<()>> {
        let mut table = self.table();
        table.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        Arc::clone(table.entry(key).or_default())
    }

    /// Wait for exclusive access to an admin.
    pub async fn lock_admin(&self, id: &AdminId) -> AdminGuard {
        let mutex = self.entry(LockKey::Admin(id.clone()));
        AdminGuard {
            admin_id: id.clone(),
            _guard: mutex.lock_owned().await,
        }
    }

    /// Wait for exclusive access to a user while holding an admin.
    pub async fn lock_user<'a>(&self, admin: &'a AdminGuard, id: &UserId) -> UserGuard<'a> {
        let mutex = self.entry(LockKey::User(id.clone()));
        UserGuard {
            _admin: admin,
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of lock entries currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
