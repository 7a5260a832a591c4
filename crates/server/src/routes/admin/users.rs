//! User management.
//!
//! Role changes and deletions fan out to the user's reviews in the same
//! transaction. Admins cannot demote or delete themselves.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ramen_map_core::pagination::Page;
use ramen_map_core::{UserId, UserRole};

use crate::db::users::AdminUserUpdate;
use crate::db::{User, UserRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::ListQuery;
use crate::services::ProfileService;
use crate::state::AppState;

/// User routes under `/admin/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(index))
        .route("/users/{id}", patch(update).delete(delete))
}

/// `PATCH /admin/api/users/{id}` body.
#[derive(Debug, Default, Deserialize)]
pub struct UserUpdateRequest {
    pub role: Option<UserRole>,
    pub email_verified: Option<bool>,
}

/// Result of a user deletion.
#[derive(Debug, Serialize)]
pub struct DeletedUser {
    pub id: UserId,
    /// Reviews switched to "Deleted user".
    pub anonymized_reviews: u64,
}

/// Reject changes that would lock the acting admin out.
fn check_self_update(admin: &User, target: UserId, req: &UserUpdateRequest) -> Result<()> {
    if admin.id == target && req.role.is_some_and(|role| !role.is_admin()) {
        return Err(AppError::BadRequest(
            "you cannot remove your own admin role".to_owned(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<User>>> {
    let page = query.page()?;
    Ok(Json(
        UserRepository::new(state.pool())
            .list(&query.tokens(), &page)
            .await?,
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    Json(req): Json<UserUpdateRequest>,
) -> Result<Json<User>> {
    check_self_update(&admin, id, &req)?;

    let update = AdminUserUpdate {
        role: req.role,
        email_verified: req.email_verified,
    };
    let user = ProfileService::new(state.pool())
        .update_admin_fields(id, update)
        .await?;
    Ok(Json(user))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<Json<DeletedUser>> {
    if admin.id == id {
        return Err(AppError::BadRequest(
            "you cannot delete your own account here".to_owned(),
        ));
    }

    let anonymized_reviews = ProfileService::new(state.pool()).delete_user(id).await?;
    Ok(Json(DeletedUser {
        id,
        anonymized_reviews,
    }))
}
