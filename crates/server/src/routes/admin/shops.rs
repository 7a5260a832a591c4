//! Shop management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use tracing::instrument;

use ramen_map_core::pagination::Page;
use ramen_map_core::{ShopDraft, ShopId};

use crate::db::{Shop, ShopFilter, ShopRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::ListQuery;
use crate::state::AppState;

/// Shop routes under `/admin/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/shops", get(index).post(create))
        .route("/shops/{id}", get(show).put(update).delete(delete))
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Shop>>> {
    let page = query.page()?;
    let filter = ShopFilter {
        tokens: query.tokens(),
        ..ShopFilter::default()
    };
    Ok(Json(
        ShopRepository::new(state.pool()).list(&filter, &page).await?,
    ))
}

#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<ShopDraft>,
) -> Result<(StatusCode, Json<Shop>)> {
    let draft = draft.normalize()?;
    let shop = ShopRepository::new(state.pool()).create(&draft).await?;
    tracing::info!(shop_id = %shop.id, name = %shop.name, "Shop created");
    Ok((StatusCode::CREATED, Json(shop)))
}

async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<Json<Shop>> {
    ShopRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("shop {id}")))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
    Json(draft): Json<ShopDraft>,
) -> Result<Json<Shop>> {
    let draft = draft.normalize()?;
    Ok(Json(
        ShopRepository::new(state.pool()).update(id, &draft).await?,
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<StatusCode> {
    ShopRepository::new(state.pool()).delete(id).await?;
    tracing::info!(shop_id = %id, "Shop deleted");
    Ok(StatusCode::NO_CONTENT)
}
