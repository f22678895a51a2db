//! `PostgreSQL` account store.
//!
//! Records are rows with JSONB columns for the nested document parts. Every
//! update bumps `version`, and a patch carrying `expected_version` only
//! matches a row still at that version.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use backroom_core::{
    Admin, AdminId, AdminName, AdminPatch, LinkState, Roles, User, UserId, UserPatch,
};

use super::StoreError;
use super::store::{AccountStore, ListParams, Page, StoreFuture};

const ADMIN_COLUMNS: &str =
    "id, name, permissions, admin_groups, linked_user, version, time_created";
const USER_COLUMNS: &str = "id, username, roles, version, time_created";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` admin queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminRow {
    id: String,
    name: Json<AdminName>,
    permissions: Json<BTreeMap<String, bool>>,
    admin_groups: Json<BTreeMap<String, String>>,
    linked_user: Option<Json<serde_json::Value>>,
    version: i64,
    time_created: DateTime<Utc>,
}

impl TryFrom<AdminRow> for Admin {
    type Error = StoreError;

    fn try_from(row: AdminRow) -> Result<Self, Self::Error> {
        let user: LinkState<UserId> = match row.linked_user {
            None => LinkState::Unlinked,
            Some(Json(value)) => serde_json::from_value(value).map_err(|e| {
                StoreError::DataCorruption(format!("invalid linked user on admin {}: {e}", row.id))
            })?,
        };

        Ok(Self {
            id: AdminId::new(row.id),
            name: row.name.0,
            permissions: row.permissions.0,
            groups: row.admin_groups.0,
            user,
            version: row.version,
            time_created: row.time_created,
        })
    }
}

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    roles: Json<serde_json::Value>,
    version: i64,
    time_created: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles: Roles = serde_json::from_value(row.roles.0).map_err(|e| {
            StoreError::DataCorruption(format!("invalid roles on user {}: {e}", row.id))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username: row.username,
            roles,
            version: row.version,
            time_created: row.time_created,
        })
    }
}

/// The stored form of a link state: `NULL` when unlinked, an object otherwise.
fn stored_link<I: AsRef<str>>(state: &LinkState<I>) -> Option<Json<&LinkState<I>>> {
    (!state.is_unlinked()).then_some(Json(state))
}

// =============================================================================
// Store
// =============================================================================

/// Account store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    async fn fetch_admin(&self, id: &AdminId) -> Result<Option<Admin>, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM backroom.admin WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM backroom.account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    #[instrument(skip(self))]
    async fn fetch_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM backroom.account WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Explain why a guarded update matched no row.
    async fn missed_update(
        &self,
        table: &str,
        id: &str,
        expected_version: Option<i64>,
    ) -> StoreError {
        let exists = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT version FROM backroom.{table} WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        match (exists, expected_version) {
            (Err(e), _) => StoreError::Database(e),
            (Ok(None), _) | (Ok(Some(_)), None) => StoreError::NotFound,
            (Ok(Some(_)), Some(expected)) => StoreError::VersionConflict { expected },
        }
    }

    #[instrument(skip(self, patch), fields(expected_version = ?patch.expected_version))]
    async fn patch_admin(&self, id: &AdminId, patch: AdminPatch) -> Result<Admin, StoreError> {
        let linked_user = patch.user.as_ref().and_then(stored_link);

        let row = sqlx::query_as::<_, AdminRow>(&format!(
            r"
            UPDATE backroom.admin
            SET name = COALESCE($3, name),
                permissions = COALESCE($4, permissions),
                admin_groups = COALESCE($5, admin_groups),
                linked_user = CASE WHEN $6 THEN $7 ELSE linked_user END,
                version = version + 1
            WHERE id = $1 AND ($2::BIGINT IS NULL OR version = $2)
            RETURNING {ADMIN_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.expected_version)
        .bind(patch.name.as_ref().map(Json))
        .bind(patch.permissions.as_ref().map(Json))
        .bind(patch.groups.as_ref().map(Json))
        .bind(patch.touches_link())
        .bind(linked_user)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self
                .missed_update("admin", id.as_str(), patch.expected_version)
                .await),
        }
    }

    #[instrument(skip(self, patch), fields(expected_version = ?patch.expected_version))]
    async fn patch_user(&self, id: &UserId, patch: UserPatch) -> Result<User, StoreError> {
        let admin_role = patch.admin_role.as_ref().and_then(stored_link);

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE backroom.account
            SET roles = CASE
                    WHEN NOT $3 THEN roles
                    WHEN $4::JSONB IS NULL THEN roles - 'admin'
                    ELSE jsonb_set(roles, '{{admin}}', $4::JSONB)
                END,
                version = version + 1
            WHERE id = $1 AND ($2::BIGINT IS NULL OR version = $2)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(patch.expected_version)
        .bind(patch.admin_role.is_some())
        .bind(admin_role)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(self
                .missed_update("account", id.as_str(), patch.expected_version)
                .await),
        }
    }

    #[instrument(skip(self))]
    async fn page_admins(&self, params: ListParams) -> Result<Page<Admin>, StoreError> {
        let offset = i64::try_from(params.offset())
            .map_err(|_| StoreError::Unavailable("page offset out of range".to_owned()))?;

        let rows = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM backroom.admin ORDER BY time_created, id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(params.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM backroom.admin")
            .fetch_one(&self.pool)
            .await?;

        let admins = rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<Admin>, _>>()?;

        Ok(Page::new(admins, params, u64::try_from(total).unwrap_or(0)))
    }

    #[instrument(skip(self))]
    async fn insert_admin(&self, name: AdminName) -> Result<Admin, StoreError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "INSERT INTO backroom.admin (id, name) VALUES ($1, $2) RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(AdminId::generate())
        .bind(Json(&name))
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    #[instrument(skip(self))]
    async fn remove_admin(&self, id: &AdminId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM backroom.admin WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn insert_user(&self, username: String) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO backroom.account (id, username) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::generate())
        .bind(&username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::Conflict("username already exists".to_owned());
            }
            StoreError::Database(e)
        })?;

        row.try_into()
    }
}

impl AccountStore for PgAccountStore {
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
    }

    fn find_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, Option<Admin>> {
        Box::pin(self.fetch_admin(id))
    }

    fn find_user<'a>(&'a self, id: &'a UserId) -> StoreFuture<'a, Option<User>> {
        Box::pin(self.fetch_user(id))
    }

    fn find_user_by_username<'a>(&'a self, username: &'a str) -> StoreFuture<'a, Option<User>> {
        Box::pin(self.fetch_user_by_username(username))
    }

    fn update_admin<'a>(&'a self, id: &'a AdminId, patch: AdminPatch) -> StoreFuture<'a, Admin> {
        Box::pin(self.patch_admin(id, patch))
    }

    fn update_user<'a>(&'a self, id: &'a UserId, patch: UserPatch) -> StoreFuture<'a, User> {
        Box::pin(self.patch_user(id, patch))
    }

    fn list_admins(&self, params: ListParams) -> StoreFuture<'_, Page<Admin>> {
        Box::pin(self.page_admins(params))
    }

    fn create_admin(&self, name: AdminName) -> StoreFuture<'_, Admin> {
        Box::pin(self.insert_admin(name))
    }

    fn delete_admin<'a>(&'a self, id: &'a AdminId) -> StoreFuture<'a, bool> {
        Box::pin(self.remove_admin(id))
    }

    fn create_user(&self, username: String) -> StoreFuture<'_, User> {
        Box::pin(self.insert_user(username))
    }
}
