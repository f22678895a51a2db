//! The account store port.

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use backroom_core::{Admin, AdminId, AdminName, AdminPatch, User, UserId, UserPatch};

use super::StoreError;

/// Boxed future type alias used by [`AccountStore`] to keep the trait dyn-compatible.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persistence for admin and user records.
///
/// Reads return `Ok(None)` when the record is absent. Updates apply a patch
/// to one record, bump its version and return the stored result; they fail
/// with [`StoreError::NotFound`] when the record is absent and with
/// [`StoreError::VersionConflict`] when the patch's `expected_version` no
/// longer matches.
pub trait AccountStore: Send + Sync {
    /// Check that the store is reachable.
    fn ping(&self) -> StoreFuture<'_, ()>;

    /// Fetch an admin by id.
    fn find_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, Option<Admin>>;

    /// Fetch a user by id.
    fn find_user<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<User>>;

    /// Fetch a user by username.
    fn find_user_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>>;

    /// Apply a patch to an admin.
    fn update_admin<'a>(&'a self, id: &'a AdminId, patch: AdminPatch) -> StoreFuture<'a, Admin>;

    /// Apply a patch to a user.
    fn update_user<'a>(&'a self, id: &'a UserId, patch: UserPatch) -> StoreFuture<'a, User>;

    /// List admins a page at a time, oldest first.
    fn list_admins(&self, params: ListParams) -> StoreFuture<'_, Page<Admin>>;

    /// Create an unlinked admin with a generated id.
    fn create_admin(&self, name: AdminName) -> StoreFuture<'_, Admin>;

    /// Delete an admin. Returns `false` if it did not exist.
    fn delete_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, bool>;

    /// Create a user with a generated id and no roles.
    ///
    /// Fails with [`StoreError::Conflict`] if the username is taken.
    fn create_user(&self, username: String) -> StoreFuture<'_, User>;
}

/// Paging parameters for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Items per page.
    pub limit: u32,
    /// One-based page number.
    pub page: u32,
}

impl ListParams {
    /// Default page size.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Largest page size a caller may ask for.
    pub const MAX_LIMIT: u32 = 100;

    /// Build parameters, clamping the limit to `1..=MAX_LIMIT` and the page to at least 1.
    #[must_use]
    pub fn new(limit: Option<u32>, page: Option<u32>) -> Self {
        Self {
            limit: limit
                .unwrap_or(Self::DEFAULT_LIMIT)
                .clamp(1, Self::MAX_LIMIT),
            page: page.unwrap_or(1).max(1),
        }
    }

    /// Number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for ListParams {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// The records on this page.
    pub data: Vec<T>,
    /// Page navigation.
    pub pages: PageInfo,
    /// Item counts.
    pub items: ItemInfo,
}

/// Page navigation details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct PageInfo {
    /// Current page number.
    pub current: u32,
    /// Previous page number, if any.
    pub prev: Option<u32>,
    /// Whether a previous page exists.
    pub has_prev: bool,
    /// Next page number, if any.
    pub next: Option<u32>,
    /// Whether a next page exists.
    pub has_next: bool,
    /// Total number of pages.
    pub total: u64,
}

/// Item count details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemInfo {
    /// Page size.
    pub limit: u32,
    /// One-based position of the first item on this page (0 when empty).
    pub begin: u64,
    /// One-based position of the last item on this page (0 when empty).
    pub end: u64,
    /// Total number of items.
    pub total: u64,
}

impl<T> Page<T> {
    /// Assemble a page from its records and the total item count.
    #[must_use]
    pub fn new(data: Vec<T>, params: ListParams, total: u64) -> Self {
        let limit = u64::from(params.limit);
        let total_pages = total.div_ceil(limit);
        let current = params.page;
        let has_prev = current > 1;
        let has_next = u64::from(current) < total_pages;
        let begin = if data.is_empty() {
            0
        } else {
            params.offset() + 1
        };
        let end = if data.is_empty() {
            0
        } else {
            params.offset() + data.len() as u64
        };

        Self {
            data,
            pages: PageInfo {
                current,
                prev: has_prev.then(|| current - 1),
                has_prev,
                next: has_next.then(|| current + 1),
                has_next,
                total: total_pages,
            },
            items: ItemInfo {
                limit: params.limit,
                begin,
                end,
                total,
            },
        }
    }
}
