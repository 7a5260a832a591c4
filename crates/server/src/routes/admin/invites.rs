//! Invite code management.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete as delete_route, get},
};
use serde::Deserialize;
use tracing::instrument;

use ramen_map_core::InviteCodeId;

use crate::db::{InviteCodeRecord, InviteRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// Most codes generated per request.
pub const MAX_BATCH: usize = 50;

/// Invite routes under `/admin/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invite-codes", get(index).post(create))
        .route("/invite-codes/{id}", delete_route(delete))
}

/// `POST /admin/api/invite-codes` body.
#[derive(Debug, Default, Deserialize)]
pub struct CreateInvitesRequest {
    #[serde(default)]
    pub count: Option<usize>,
}

impl CreateInvitesRequest {
    fn count(&self) -> Result<usize> {
        match self.count.unwrap_or(1) {
            n @ 1..=MAX_BATCH => Ok(n),
            _ => Err(AppError::BadRequest(format!(
                "count must be between 1 and {MAX_BATCH}"
            ))),
        }
    }
}

async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<InviteCodeRecord>>> {
    Ok(Json(InviteRepository::new(state.pool()).list_all().await?))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    body: Option<Json<CreateInvitesRequest>>,
) -> Result<(StatusCode, Json<Vec<InviteCodeRecord>>)> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let count = req.count()?;

    let codes = InviteRepository::new(state.pool())
        .create_many(count, Some(admin.id))
        .await?;
    tracing::info!(count, "Invite codes created");
    Ok((StatusCode::CREATED, Json(codes)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<InviteCodeId>,
) -> Result<StatusCode> {
    InviteRepository::new(state.pool()).delete_unused(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
