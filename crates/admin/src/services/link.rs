//! Link orchestration between admins and users.
//!
//! The two records live in separate documents with no shared transaction.
//! A link or unlink reads both sides under the record locks, asks the
//! evaluator for a decision, then writes both sides concurrently. A failed
//! write is reported with whichever side did land; nothing is rolled back.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use backroom_core::{
    Admin, AdminId, ConflictReason, LinkDecision, UnlinkDecision, User, UserId, decide_link,
    decide_unlink, unlink_user_patch,
};

use crate::db::{AccountStore, StoreError};
use crate::services::locks::LinkLocks;

/// Which kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Admin,
    User,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::User => f.write_str("user"),
        }
    }
}

/// Both halves of a link write, at least one of which failed.
#[derive(Debug)]
pub struct WriteFailure {
    /// Admin the write targeted.
    pub admin_id: AdminId,
    /// User the write targeted.
    pub user_id: UserId,
    /// Error from the admin-side write, if it failed.
    pub admin: Option<StoreError>,
    /// Error from the user-side write, if it failed.
    pub user: Option<StoreError>,
}

impl WriteFailure {
    /// Whether exactly one side was written, leaving the pair inconsistent.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.admin.is_some() != self.user.is_some()
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "link write failed for admin {} / user {}",
            self.admin_id, self.user_id
        )?;
        if let Some(e) = &self.admin {
            write!(f, "; admin side: {e}")?;
        }
        if let Some(e) = &self.user {
            write!(f, "; user side: {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for WriteFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.admin
            .as_ref()
            .or(self.user.as_ref())
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Errors from a link or unlink.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A record could not be read.
    #[error("failed to read {kind}: {source}")]
    ReadFailure {
        kind: RecordKind,
        source: StoreError,
    },

    /// A record does not exist.
    #[error("{0} not found")]
    NotFound(RecordKind),

    /// One side is already linked.
    #[error(transparent)]
    Conflict(#[from] ConflictReason),

    /// One or both writes failed.
    #[error(transparent)]
    WriteFailure(#[from] WriteFailure),
}

fn read_failure(kind: RecordKind) -> impl Fn(StoreError) -> LinkError {
    move |source| LinkError::ReadFailure { kind, source }
}

/// Successful result of a link or unlink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Both sides now reference each other.
    Linked { admin: Admin, user: User },
    /// Both sides had their references cleared.
    Unlinked { admin: Admin, user: User },
    /// The admin had no usable user reference; nothing was written.
    AlreadyUnlinked { admin: Admin },
}

impl LinkOutcome {
    /// The admin record after the operation.
    #[must_use]
    pub const fn admin(&self) -> &Admin {
        match self {
            Self::Linked { admin, .. }
            | Self::Unlinked { admin, .. }
            | Self::AlreadyUnlinked { admin } => admin,
        }
    }

    #[must_use]
    pub fn into_admin(self) -> Admin {
        match self {
            Self::Linked { admin, .. }
            | Self::Unlinked { admin, .. }
            | Self::AlreadyUnlinked { admin } => admin,
        }
    }
}

/// Creates and removes admin/user links.
#[derive(Clone)]
pub struct LinkService {
    store: Arc<dyn AccountStore>,
    locks: Arc<LinkLocks>,
}

impl LinkService {
    #[must_use]
    pub const fn new(store: Arc<dyn AccountStore>, locks: Arc<LinkLocks>) -> Self {
        Self { store, locks }
    }

    /// Lock table shared with other writers of admin records.
    #[must_use]
    pub const fn locks(&self) -> &Arc<LinkLocks> {
        &self.locks
    }

    /// Link an admin to the user with the given username.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotFound`] if the admin or user does not exist
    /// - [`LinkError::Conflict`] if either side is already linked, including
    ///   to each other
    /// - [`LinkError::ReadFailure`] / [`LinkError::WriteFailure`] on store errors
    #[instrument(skip(self, admin_id), fields(admin_id = %admin_id))]
    pub async fn link(&self, admin_id: &AdminId, username: &str) -> Result<LinkOutcome, LinkError> {
        let admin_guard = self.locks.lock_admin(admin_id).await;

        let admin = self
            .store
            .find_admin(admin_id)
            .await
            .map_err(read_failure(RecordKind::Admin))?
            .ok_or(LinkError::NotFound(RecordKind::Admin))?;

        let user_id = self
            .store
            .find_user_by_username(username)
            .await
            .map_err(read_failure(RecordKind::User))?
            .ok_or(LinkError::NotFound(RecordKind::User))?
            .id;

        // The user may have changed between the lookup and taking its lock.
        let _user_guard = self.locks.lock_user(&admin_guard, &user_id).await;
        let user = self
            .store
            .find_user(&user_id)
            .await
            .map_err(read_failure(RecordKind::User))?
            .ok_or(LinkError::NotFound(RecordKind::User))?;

        match decide_link(&admin, &user) {
            LinkDecision::Conflict(reason) => Err(reason.into()),
            LinkDecision::Proceed {
                admin: admin_patch,
                user: user_patch,
            } => {
                let (admin_result, user_result) = tokio::join!(
                    self.store.update_admin(&admin.id, admin_patch),
                    self.store.update_user(&user.id, user_patch),
                );

                match (admin_result, user_result) {
                    (Ok(admin), Ok(user)) => Ok(LinkOutcome::Linked { admin, user }),
                    (admin_result, user_result) => Err(WriteFailure {
                        admin_id: admin.id,
                        user_id: user.id,
                        admin: admin_result.err(),
                        user: user_result.err(),
                    }
                    .into()),
                }
            }
        }
    }

    /// Remove an admin's link, clearing both sides.
    ///
    /// An admin with no user reference, or with one that carries no id, is
    /// already unlinked and is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`LinkError::NotFound`] if the admin, or the user it references, does not exist
    /// - [`LinkError::ReadFailure`] / [`LinkError::WriteFailure`] on store errors
    #[instrument(skip(self, admin_id), fields(admin_id = %admin_id))]
    pub async fn unlink(&self, admin_id: &AdminId) -> Result<LinkOutcome, LinkError> {
        let admin_guard = self.locks.lock_admin(admin_id).await;

        let admin = self
            .store
            .find_admin(admin_id)
            .await
            .map_err(read_failure(RecordKind::Admin))?
            .ok_or(LinkError::NotFound(RecordKind::Admin))?;

        let (user_id, admin_patch) = match decide_unlink(&admin) {
            UnlinkDecision::NoOp => return Ok(LinkOutcome::AlreadyUnlinked { admin }),
            UnlinkDecision::Proceed { user_id, admin } => (user_id, admin),
        };

        let _user_guard = self.locks.lock_user(&admin_guard, &user_id).await;
        let user = self
            .store
            .find_user(&user_id)
            .await
            .map_err(read_failure(RecordKind::User))?
            .ok_or(LinkError::NotFound(RecordKind::User))?;

        let (admin_result, user_result) = tokio::join!(
            self.store.update_admin(&admin.id, admin_patch),
            self.store.update_user(&user.id, unlink_user_patch(&user)),
        );

        match (admin_result, user_result) {
            (Ok(admin), Ok(user)) => Ok(LinkOutcome::Unlinked { admin, user }),
            (admin_result, user_result) => Err(WriteFailure {
                admin_id: admin.id,
                user_id: user.id,
                admin: admin_result.err(),
                user: user_result.err(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use backroom_core::{AdminName, AdminPatch, LinkState, UserPatch};

    use super::*;
    use crate::db::{InMemoryAccountStore, ListParams, Page, StoreFuture, StoreOp};

    const ADMIN: &str = "93EP150D35";
    const USER: &str = "535H0W35";

    fn ren_admin() -> Admin {
        Admin::new(
            AdminId::new(ADMIN),
            AdminName::new("Ren", "", "Höek"),
            Utc::now(),
        )
    }

    fn ren_user() -> User {
        User::new(UserId::new(USER), "ren", Utc::now())
    }

    async fn setup(admin: Admin, user: User) -> (Arc<InMemoryAccountStore>, LinkService) {
        let store = Arc::new(InMemoryAccountStore::journaled());
        store.insert_admin(admin).await;
        store.insert_user(user).await;
        let service = LinkService::new(store.clone(), Arc::new(LinkLocks::new()));
        (store, service)
    }

    async fn stored(store: &InMemoryAccountStore) -> (Admin, User) {
        let admin = store.find_admin(&AdminId::new(ADMIN)).await.unwrap().unwrap();
        let user = store.find_user(&UserId::new(USER)).await.unwrap().unwrap();
        (admin, user)
    }

    #[tokio::test]
    async fn test_link_unlinked_pair() {
        let (store, service) = setup(ren_admin(), ren_user()).await;

        let outcome = service.link(&AdminId::new(ADMIN), "ren").await.unwrap();

        let LinkOutcome::Linked { admin, user } = outcome else {
            panic!("expected linked outcome");
        };
        assert_eq!(admin.user, LinkState::linked(UserId::new(USER), "ren"));
        assert_eq!(
            user.roles.admin,
            LinkState::linked(AdminId::new(ADMIN), "Ren Höek")
        );
        assert_eq!(admin.version, 2);
        assert_eq!(user.version, 2);

        let (admin, user) = stored(&store).await;
        assert_eq!(admin.user.peer_id(), Some(&user.id));
        assert_eq!(user.roles.admin.peer_id(), Some(&admin.id));
    }

    #[tokio::test]
    async fn test_link_conflict_when_user_already_linked() {
        let mut user = ren_user();
        user.roles.admin = LinkState::linked(AdminId::new(USER), "Stimpson J Cat");
        let (store, service) = setup(ren_admin(), user).await;

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        assert!(matches!(
            err,
            LinkError::Conflict(ConflictReason::UserAlreadyLinked)
        ));
        assert_eq!(store.count(StoreOp::UpdateAdmin), 0);
        assert_eq!(store.count(StoreOp::UpdateUser), 0);
    }

    #[tokio::test]
    async fn test_link_conflict_when_admin_already_linked() {
        let mut admin = ren_admin();
        admin.user = LinkState::linked(UserId::new("N0T1TDUD3"), "stimpy");
        let (store, service) = setup(admin, ren_user()).await;

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        assert!(matches!(
            err,
            LinkError::Conflict(ConflictReason::AdminAlreadyLinked)
        ));
        assert_eq!(store.count(StoreOp::UpdateAdmin), 0);
        assert_eq!(store.count(StoreOp::UpdateUser), 0);
    }

    #[tokio::test]
    async fn test_relink_same_pair_conflicts() {
        let (_store, service) = setup(ren_admin(), ren_user()).await;
        service.link(&AdminId::new(ADMIN), "ren").await.unwrap();

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();
        assert!(matches!(err, LinkError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_link_admin_not_found_checked_before_user() {
        let (store, service) = setup(ren_admin(), ren_user()).await;

        let err = service
            .link(&AdminId::new("N0T1TDUD3"), "nobody")
            .await
            .unwrap_err();

        assert!(matches!(err, LinkError::NotFound(RecordKind::Admin)));
        assert_eq!(store.calls(), vec![StoreOp::FindAdmin]);
    }

    #[tokio::test]
    async fn test_link_user_not_found() {
        let (store, service) = setup(ren_admin(), ren_user()).await;

        let err = service
            .link(&AdminId::new(ADMIN), "stimpy")
            .await
            .unwrap_err();

        assert!(matches!(err, LinkError::NotFound(RecordKind::User)));
        assert_eq!(store.count(StoreOp::UpdateAdmin), 0);
    }

    #[tokio::test]
    async fn test_link_read_failures() {
        let (store, service) = setup(ren_admin(), ren_user()).await;

        store.fail_next(StoreOp::FindAdmin);
        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::ReadFailure {
                kind: RecordKind::Admin,
                ..
            }
        ));

        store.fail_next(StoreOp::FindUserByUsername);
        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();
        assert!(matches!(
            err,
            LinkError::ReadFailure {
                kind: RecordKind::User,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_link_user_write_fails_after_admin_write() {
        let (store, service) = setup(ren_admin(), ren_user()).await;
        store.fail_next(StoreOp::UpdateUser);

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(failure.is_partial());
        assert!(failure.admin.is_none());
        assert!(matches!(failure.user, Some(StoreError::Unavailable(_))));

        // The admin side landed and is not rolled back.
        let (admin, user) = stored(&store).await;
        assert!(admin.user.is_linked());
        assert!(user.roles.admin.is_unlinked());
    }

    #[tokio::test]
    async fn test_link_admin_write_fails_alone() {
        let (store, service) = setup(ren_admin(), ren_user()).await;
        store.fail_next(StoreOp::UpdateAdmin);

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(failure.is_partial());
        assert!(matches!(failure.admin, Some(StoreError::Unavailable(_))));
        assert!(failure.user.is_none());

        let (admin, user) = stored(&store).await;
        assert!(admin.user.is_unlinked());
        assert_eq!(user.roles.admin.peer_id(), Some(&AdminId::new(ADMIN)));
    }

    #[tokio::test]
    async fn test_link_user_refresh_fails() {
        let (store, service) = setup(ren_admin(), ren_user()).await;
        store.fail_next(StoreOp::FindUser);

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        assert!(matches!(
            err,
            LinkError::ReadFailure {
                kind: RecordKind::User,
                ..
            }
        ));
        assert_eq!(store.count(StoreOp::FindUserByUsername), 1);
        assert_eq!(store.count(StoreOp::UpdateAdmin), 0);
        assert_eq!(store.count(StoreOp::UpdateUser), 0);
    }

    #[tokio::test]
    async fn test_link_both_writes_fail() {
        let (store, service) = setup(ren_admin(), ren_user()).await;
        store.fail_next(StoreOp::UpdateAdmin);
        store.fail_next(StoreOp::UpdateUser);

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(!failure.is_partial());
        assert!(failure.to_string().contains("admin side"));
        assert!(failure.to_string().contains("user side"));
    }

    #[tokio::test]
    async fn test_unlink_without_user_reads_admin_only() {
        let (store, service) = setup(ren_admin(), ren_user()).await;

        let outcome = service.unlink(&AdminId::new(ADMIN)).await.unwrap();

        assert!(matches!(outcome, LinkOutcome::AlreadyUnlinked { .. }));
        assert_eq!(store.calls(), vec![StoreOp::FindAdmin]);
    }

    #[tokio::test]
    async fn test_unlink_with_dangling_user_is_noop() {
        let mut admin = ren_admin();
        admin.user = LinkState::Dangling {
            name: Some("ren".to_owned()),
        };
        let (store, service) = setup(admin, ren_user()).await;

        let outcome = service.unlink(&AdminId::new(ADMIN)).await.unwrap();

        assert_eq!(outcome.admin().version, 1);
        assert_eq!(store.calls(), vec![StoreOp::FindAdmin]);
    }

    #[tokio::test]
    async fn test_unlink_linked_pair() {
        let mut admin = ren_admin();
        admin.user = LinkState::linked(UserId::new(USER), "ren");
        let mut user = ren_user();
        user.roles.admin = LinkState::linked(AdminId::new(ADMIN), "Ren Höek");
        user.roles
            .other
            .insert("account".to_owned(), serde_json::json!({"id": "4CC0UNT"}));
        let (store, service) = setup(admin, user).await;

        let outcome = service.unlink(&AdminId::new(ADMIN)).await.unwrap();

        assert!(matches!(outcome, LinkOutcome::Unlinked { .. }));
        let (admin, user) = stored(&store).await;
        assert!(admin.user.is_unlinked());
        assert!(user.roles.admin.is_unlinked());
        assert!(user.roles.other.contains_key("account"));
    }

    #[tokio::test]
    async fn test_unlink_missing_user() {
        let mut admin = ren_admin();
        admin.user = LinkState::linked(UserId::new("N0T1TDUD3"), "stimpy");
        let (store, service) = setup(admin, ren_user()).await;

        let err = service.unlink(&AdminId::new(ADMIN)).await.unwrap_err();

        assert!(matches!(err, LinkError::NotFound(RecordKind::User)));
        assert_eq!(store.count(StoreOp::UpdateAdmin), 0);
    }

    #[tokio::test]
    async fn test_unlink_admin_write_fails() {
        let mut admin = ren_admin();
        admin.user = LinkState::linked(UserId::new(USER), "ren");
        let mut user = ren_user();
        user.roles.admin = LinkState::linked(AdminId::new(ADMIN), "Ren Höek");
        let (store, service) = setup(admin, user).await;
        store.fail_next(StoreOp::UpdateAdmin);

        let err = service.unlink(&AdminId::new(ADMIN)).await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(failure.is_partial());
        let (admin, user) = stored(&store).await;
        assert!(admin.user.is_linked());
        assert!(user.roles.admin.is_unlinked());
    }

    #[tokio::test]
    async fn test_unlink_user_write_fails() {
        let mut admin = ren_admin();
        admin.user = LinkState::linked(UserId::new(USER), "ren");
        let mut user = ren_user();
        user.roles.admin = LinkState::linked(AdminId::new(ADMIN), "Ren Höek");
        let (store, service) = setup(admin, user).await;
        store.fail_next(StoreOp::UpdateUser);

        let err = service.unlink(&AdminId::new(ADMIN)).await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(failure.is_partial());
        assert!(failure.admin.is_none());
        assert!(matches!(failure.user, Some(StoreError::Unavailable(_))));

        let (admin, user) = stored(&store).await;
        assert!(admin.user.is_unlinked());
        assert!(user.roles.admin.is_linked());
    }

    #[tokio::test]
    async fn test_concurrent_links_to_one_user() {
        let other = Admin::new(
            AdminId::new("DUD3N0T1T"),
            AdminName::new("Stimpson", "J", "Cat"),
            Utc::now(),
        );
        let (store, service) = setup(ren_admin(), ren_user()).await;
        store.insert_admin(other).await;

        let (ren, stimpy) = (AdminId::new(ADMIN), AdminId::new("DUD3N0T1T"));
        let (first, second) = tokio::join!(service.link(&ren, "ren"), service.link(&stimpy, "ren"));

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(LinkError::Conflict(ConflictReason::UserAlreadyLinked))
        )));
    }

    /// Store that lets another writer touch a user right after it is read.
    struct RacingStore {
        inner: InMemoryAccountStore,
    }

    impl AccountStore for RacingStore {
        fn ping(&self) -> StoreFuture<'_, ()> {
            self.inner.ping()
        }

        fn find_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, Option<Admin>> {
            self.inner.find_admin(id)
        }

        fn find_user<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<User>> {
            Box::pin(async move {
                let user = self.inner.find_user(id).await?;
                self.inner.update_user(id, UserPatch::default()).await?;
                Ok(user)
            })
        }

        fn find_user_by_username<'a>(
            &'a self,
            username: &'a str,
        ) -> StoreFuture<'a, Option<User>> {
            self.inner.find_user_by_username(username)
        }

        fn update_admin<'a>(
            &'a self,
            id: &'a AdminId,
            patch: AdminPatch,
        ) -> StoreFuture<'a, Admin> {
            self.inner.update_admin(id, patch)
        }

        fn update_user<'a>(&'a self, id: &'a UserId, patch: UserPatch) -> StoreFuture<'a, User> {
            self.inner.update_user(id, patch)
        }

        fn list_admins(&self, params: ListParams) -> StoreFuture<'_, Page<Admin>> {
            self.inner.list_admins(params)
        }

        fn create_admin(&self, name: AdminName) -> StoreFuture<'_, Admin> {
            self.inner.create_admin(name)
        }

        fn delete_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, bool> {
            self.inner.delete_admin(id)
        }

        fn create_user(&self, username: String) -> StoreFuture<'_, User> {
            self.inner.create_user(username)
        }
    }

    #[tokio::test]
    async fn test_stale_user_version_is_a_write_failure() {
        let inner = InMemoryAccountStore::new();
        inner.insert_admin(ren_admin()).await;
        inner.insert_user(ren_user()).await;
        let service = LinkService::new(Arc::new(RacingStore { inner }), Arc::new(LinkLocks::new()));

        let err = service.link(&AdminId::new(ADMIN), "ren").await.unwrap_err();

        let LinkError::WriteFailure(failure) = err else {
            panic!("expected write failure");
        };
        assert!(matches!(
            failure.user,
            Some(StoreError::VersionConflict { expected: 1 })
        ));
        assert!(failure.is_partial());
    }
}
