//! In-memory account store.
//!
//! Used when `ADMIN_STORE=memory` and throughout the tests. A store built
//! with [`InMemoryAccountStore::journaled`] records every call so tests can
//! check which operations ran, and individual operations can be made to fail
//! on demand.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::RwLock;

use backroom_core::{Admin, AdminId, AdminName, AdminPatch, User, UserId, UserPatch};

use super::StoreError;
use super::store::{AccountStore, ListParams, Page, StoreFuture};

/// A store operation, as recorded in the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ping,
    FindAdmin,
    FindUser,
    FindUserByUsername,
    UpdateAdmin,
    UpdateUser,
    ListAdmins,
    CreateAdmin,
    DeleteAdmin,
    CreateUser,
}

#[derive(Debug, Default)]
struct Faults {
    once: Vec<StoreOp>,
    always: HashSet<StoreOp>,
}

/// Account store backed by process-local maps.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    admins: RwLock<BTreeMap<AdminId, Admin>>,
    users: RwLock<BTreeMap<UserId, User>>,
    journal: bool,
    calls: Mutex<Vec<StoreOp>>,
    faults: Mutex<Faults>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that records every call in order. The journal is never
    /// trimmed, so keep this to tests.
    #[must_use]
    pub fn journaled() -> Self {
        Self {
            journal: true,
            ..Self::default()
        }
    }

    /// Store an admin as-is, replacing any record with the same id.
    pub async fn insert_admin(&self, admin: Admin) {
        self.admins.write().await.insert(admin.id.clone(), admin);
    }

    /// Store a user as-is, replacing any record with the same id.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }

    /// Operations performed so far, in call order. Always empty unless the
    /// store was built with [`journaled`](Self::journaled).
    #[must_use]
    pub fn calls(&self) -> Vec<StoreOp> {
        lock(&self.calls).clone()
    }

    /// How many times `op` has been called.
    #[must_use]
    pub fn count(&self, op: StoreOp) -> usize {
        lock(&self.calls).iter().filter(|&&c| c == op).count()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Make the next call of `op` fail with [`StoreError::Unavailable`].
    pub fn fail_next(&self, op: StoreOp) {
        lock(&self.faults).once.push(op);
    }

    /// Make every call of `op` fail until [`heal`](Self::heal) is called.
    pub fn fail_always(&self, op: StoreOp) {
        lock(&self.faults).always.insert(op);
    }

    /// Clear all injected failures.
    pub fn heal(&self) {
        let mut faults = lock(&self.faults);
        faults.once.clear();
        faults.always.clear();
    }

    /// Journal the call and report any injected failure.
    async fn enter(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.journal {
            lock(&self.calls).push(op);
        }

        let injected = {
            let mut faults = lock(&self.faults);
            if faults.always.contains(&op) {
                true
            } else if let Some(pos) = faults.once.iter().position(|&f| f == op) {
                faults.once.remove(pos);
                true
            } else {
                false
            }
        };

        // Give other tasks a chance to interleave, as a real backend would.
        tokio::task::yield_now().await;

        if injected {
            Err(StoreError::Unavailable(format!("injected failure in {op:?}")))
        } else {
            Ok(())
        }
    }
}

fn check_version(current: i64, expected: Option<i64>) -> Result<(), StoreError> {
    match expected {
        Some(expected) if expected != current => Err(StoreError::VersionConflict { expected }),
        _ => Ok(()),
    }
}

impl AccountStore for InMemoryAccountStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(self.enter(StoreOp::Ping))
    }

    fn find_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, Option<Admin>> {
        Box::pin(async move {
            self.enter(StoreOp::FindAdmin).await?;
            Ok(self.admins.read().await.get(id).cloned())
        })
    }

    fn find_user<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            self.enter(StoreOp::FindUser).await?;
            Ok(self.users.read().await.get(id).cloned())
        })
    }

    fn find_user_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(async move {
            self.enter(StoreOp::FindUserByUsername).await?;
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|u| u.username == username)
                .cloned())
        })
    }

    fn update_admin<'a>(&'a self, id: &'a AdminId, patch: AdminPatch) -> StoreFuture<'a, Admin> {
        Box::pin(async move {
            self.enter(StoreOp::UpdateAdmin).await?;
            let mut admins = self.admins.write().await;
            let admin = admins.get_mut(id).ok_or(StoreError::NotFound)?;
            check_version(admin.version, patch.expected_version)?;
            patch.apply(admin);
            admin.version += 1;
            Ok(admin.clone())
        })
    }

    fn update_user<'a>(&'a self, id: &'a UserId, patch: UserPatch) -> StoreFuture<'a, User> {
        Box::pin(async move {
            self.enter(StoreOp::UpdateUser).await?;
            let mut users = self.users.write().await;
            let user = users.get_mut(id).ok_or(StoreError::NotFound)?;
            check_version(user.version, patch.expected_version)?;
            patch.apply(user);
            user.version += 1;
            Ok(user.clone())
        })
    }

    fn list_admins(&self, params: ListParams) -> StoreFuture<'_, Page<Admin>> {
        Box::pin(async move {
            self.enter(StoreOp::ListAdmins).await?;
            let admins = self.admins.read().await;

            let mut all: Vec<&Admin> = admins.values().collect();
            all.sort_by(|a, b| {
                a.time_created
                    .cmp(&b.time_created)
                    .then_with(|| a.id.cmp(&b.id))
            });

            let skip = usize::try_from(params.offset()).unwrap_or(usize::MAX);
            let data = all
                .iter()
                .skip(skip)
                .take(params.limit as usize)
                .map(|&a| a.clone())
                .collect();

            Ok(Page::new(data, params, all.len() as u64))
        })
    }

    fn create_admin(&self, name: AdminName) -> StoreFuture<'_, Admin> {
        Box::pin(async move {
            self.enter(StoreOp::CreateAdmin).await?;
            let admin = Admin::new(AdminId::generate(), name, Utc::now());
            self.admins
                .write()
                .await
                .insert(admin.id.clone(), admin.clone());
            Ok(admin)
        })
    }

    fn delete_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.enter(StoreOp::DeleteAdmin).await?;
            Ok(self.admins.write().await.remove(id).is_some())
        })
    }

    fn create_user(&self, username: String) -> StoreFuture<'_, User> {
        Box::pin(async move {
            self.enter(StoreOp::CreateUser).await?;
            let mut users = self.users.write().await;
            if users.values().any(|u| u.username == username) {
                return Err(StoreError::Conflict("username already exists".to_owned()));
            }
            let user = User::new(UserId::generate(), username, Utc::now());
            users.insert(user.id.clone(), user.clone());
            Ok(user)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ren() -> AdminName {
        AdminName::new("Ren", "", "Höek")
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_checks_guard() {
        let store = InMemoryAccountStore::new();
        let admin = store.create_admin(ren()).await.unwrap();
        assert_eq!(admin.version, 1);

        let updated = store
            .update_admin(&admin.id, AdminPatch::name(AdminName::new("Stimpson", "J", "Cat")).guarded(1))
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.name.full(), "Stimpson J Cat");

        let stale = store
            .update_admin(&admin.id, AdminPatch::clear_user().guarded(1))
            .await;
        assert!(matches!(stale, Err(StoreError::VersionConflict { expected: 1 })));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = InMemoryAccountStore::new();
        let result = store
            .update_user(&UserId::new("N0T1TDUD3"), UserPatch::clear_admin())
            .await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = InMemoryAccountStore::new();
        store.create_user("ren".to_owned()).await.unwrap();

        let result = store.create_user("ren".to_owned()).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_fail_next_fires_once() {
        let store = InMemoryAccountStore::journaled();
        store.fail_next(StoreOp::Ping);

        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
        assert!(store.ping().await.is_ok());
        assert_eq!(store.count(StoreOp::Ping), 2);
    }

    #[tokio::test]
    async fn test_fail_always_until_healed() {
        let store = InMemoryAccountStore::new();
        store.fail_always(StoreOp::FindAdmin);
        let id = AdminId::new("93EP150D35");

        assert!(store.find_admin(&id).await.is_err());
        assert!(store.find_admin(&id).await.is_err());

        store.heal();
        assert!(store.find_admin(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_pages_in_creation_order() {
        let store = InMemoryAccountStore::journaled();
        for _ in 0..5 {
            store.create_admin(ren()).await.unwrap();
        }
        store.clear_calls();

        let page = store
            .list_admins(ListParams::new(Some(2), Some(3)))
            .await
            .unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.items.total, 5);
        assert_eq!(page.pages.total, 3);
        assert!(!page.pages.has_next);
        assert_eq!(store.calls(), vec![StoreOp::ListAdmins]);
    }

    #[tokio::test]
    async fn test_plain_store_keeps_no_journal() {
        let store = InMemoryAccountStore::new();
        store.create_admin(ren()).await.unwrap();
        store.ping().await.unwrap();

        assert!(store.calls().is_empty());
        assert_eq!(store.count(StoreOp::CreateAdmin), 0);
    }
}
