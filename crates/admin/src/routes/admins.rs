//! Admin record API handlers.
//!
//! Plain CRUD goes straight to the account store under the admin's record
//! lock. Linking and unlinking go through the link service.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use backroom_core::{Admin, AdminId, AdminName, AdminPatch};

use crate::db::{ListParams, Page};
use crate::error::AppError;
use crate::state::AppState;

/// Build the admins router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admins", get(list).post(create))
        .route("/admins/{id}", get(read).put(update).delete(remove))
        .route("/admins/{id}/permissions", put(update_permissions))
        .route("/admins/{id}/groups", put(update_groups))
        .route("/admins/{id}/user", put(link_user).delete(unlink_user))
}

/// Paging query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub page: Option<u32>,
}

/// Request for creating an admin.
#[derive(Debug, Deserialize)]
pub struct CreateAdminRequest {
    /// Free-form display name, e.g. "Ren Höek".
    pub name: String,
}

/// Request for renaming an admin.
#[derive(Debug, Deserialize)]
pub struct UpdateNameRequest {
    pub name: AdminName,
}

/// Request for replacing an admin's permissions.
#[derive(Debug, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: BTreeMap<String, bool>,
}

/// Request for replacing an admin's groups.
#[derive(Debug, Deserialize)]
pub struct UpdateGroupsRequest {
    pub groups: BTreeMap<String, String>,
}

/// Request for linking a user.
#[derive(Debug, Deserialize)]
pub struct LinkUserRequest {
    pub username: String,
}

/// Plain message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// List admins a page at a time.
///
/// # Errors
///
/// Returns an error if the store query fails.
#[instrument(skip_all, fields(limit = ?query.limit, page = ?query.page))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Admin>>, AppError> {
    let params = ListParams::new(query.limit, query.page);
    Ok(Json(state.store().list_admins(params).await?))
}

/// Create an admin from a display name.
///
/// # Errors
///
/// Returns 400 if the name is blank.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateAdminRequest>,
) -> Result<Json<Admin>, AppError> {
    let name = AdminName::parse(&body.name).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let admin = state.store().create_admin(name).await?;
    tracing::info!(admin_id = %admin.id, "Admin created");

    Ok(Json(admin))
}

/// Fetch one admin.
///
/// # Errors
///
/// Returns 404 if the admin does not exist.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Admin>, AppError> {
    let id = AdminId::new(id);
    state
        .store()
        .find_admin(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Document not found.".to_owned()))
}

/// Apply a non-link patch to an admin under its record lock.
async fn patch_admin(state: &AppState, id: String, patch: AdminPatch) -> Result<Admin, AppError> {
    let id = AdminId::new(id);
    let _guard = state.locks().lock_admin(&id).await;
    Ok(state.store().update_admin(&id, patch).await?)
}

/// Rename an admin.
///
/// # Errors
///
/// Returns 400 if first or last name is empty, 404 if the admin does not exist.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateNameRequest>,
) -> Result<Json<Admin>, AppError> {
    let name = AdminName::new(&body.name.first, &body.name.middle, &body.name.last);
    name.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(patch_admin(&state, id, AdminPatch::name(name)).await?))
}

/// Replace an admin's permissions.
///
/// # Errors
///
/// Returns 404 if the admin does not exist.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn update_permissions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePermissionsRequest>,
) -> Result<Json<Admin>, AppError> {
    Ok(Json(
        patch_admin(&state, id, AdminPatch::permissions(body.permissions)).await?,
    ))
}

/// Replace an admin's groups.
///
/// # Errors
///
/// Returns 404 if the admin does not exist.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn update_groups(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateGroupsRequest>,
) -> Result<Json<Admin>, AppError> {
    Ok(Json(
        patch_admin(&state, id, AdminPatch::groups(body.groups)).await?,
    ))
}

/// Delete an admin.
///
/// A linked admin is refused; unlink it first so the user is not left
/// pointing at a missing record.
///
/// # Errors
///
/// Returns 404 if the admin does not exist, 409 if it is linked.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = AdminId::new(id);
    let _guard = state.locks().lock_admin(&id).await;

    let admin = state
        .store()
        .find_admin(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found.".to_owned()))?;
    if admin.user.is_linked() {
        return Err(AppError::Conflict(
            "Admin is linked to a user. Unlink it first.".to_owned(),
        ));
    }

    if !state.store().delete_admin(&id).await? {
        return Err(AppError::NotFound("Document not found.".to_owned()));
    }
    tracing::info!(admin_id = %id, "Admin deleted");

    Ok(Json(MessageResponse { message: "Success." }))
}

/// Link the admin to a user by username.
///
/// # Errors
///
/// Returns 400 for a blank username, 404 if either record is missing, 409
/// if either side is already linked, 500 on store failures.
#[instrument(skip_all, fields(admin_id = %id, username = %body.username))]
pub async fn link_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LinkUserRequest>,
) -> Result<Json<Admin>, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username cannot be empty".to_owned()));
    }

    let outcome = state.links().link(&AdminId::new(id), username).await?;
    tracing::info!(admin_id = %outcome.admin().id, "Admin linked to user");

    Ok(Json(outcome.into_admin()))
}

/// Remove the admin's user link.
///
/// # Errors
///
/// Returns 404 if the admin or its linked user is missing, 500 on store failures.
#[instrument(skip_all, fields(admin_id = %id))]
pub async fn unlink_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Admin>, AppError> {
    let outcome = state.links().unlink(&AdminId::new(id)).await?;
    tracing::info!(admin_id = %outcome.admin().id, "Admin unlinked from user");

    Ok(Json(outcome.into_admin()))
}
