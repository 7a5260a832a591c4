//! Review and image management.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete as delete_route, get, post},
};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use ramen_map_core::pagination::{Page, PageRequest};
use ramen_map_core::search::query_tokens;
use ramen_map_core::{ImageId, ReviewDraft, ReviewId, ShopId};

use crate::db::{Image, ImageRepository, Review, ReviewAuthor, ReviewFilter, ReviewRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::reviews::ReviewDetail;
use crate::state::AppState;

/// Longest accepted image URL.
const MAX_IMAGE_URL_LENGTH: usize = 2048;

/// Review routes under `/admin/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", get(index).post(create))
        .route("/reviews/{id}", get(show).put(update).delete(delete))
        .route("/reviews/{id}/images", post(add_image))
        .route("/images/{id}", delete_route(delete_image))
}

/// Query parameters for the review list.
#[derive(Debug, Default, Deserialize)]
pub struct AdminReviewQuery {
    pub q: Option<String>,
    pub shop_id: Option<ShopId>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

/// `POST /admin/api/reviews/{id}/images` body.
#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub url: String,
}

/// Trim and check an image URL.
fn validate_image_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > MAX_IMAGE_URL_LENGTH {
        return Err(AppError::BadRequest("image URL is required".to_owned()));
    }
    let url = Url::parse(raw).map_err(|_| AppError::BadRequest("invalid image URL".to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::BadRequest(
            "image URL must use http or https".to_owned(),
        ));
    }
    Ok(url.to_string())
}

#[instrument(skip(state, _admin))]
async fn index(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<AdminReviewQuery>,
) -> Result<Json<Page<Review>>> {
    let page = PageRequest::from_query(query.limit, query.cursor.as_deref())?;
    let filter = ReviewFilter {
        tokens: query.q.as_deref().map(query_tokens).unwrap_or_default(),
        shop_id: query.shop_id,
        user_id: None,
    };
    Ok(Json(
        ReviewRepository::new(state.pool()).list(&filter, &page).await?,
    ))
}

/// Create a review authored by the admin.
#[instrument(skip_all, fields(admin_id = %admin.id))]
async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<Review>)> {
    let draft = draft.normalize()?;
    let review = ReviewRepository::new(state.pool())
        .create(&draft, &ReviewAuthor::from(&admin))
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Json<ReviewDetail>> {
    let review = ReviewRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))?;
    let images = ImageRepository::new(state.pool())
        .list_for_review(id)
        .await?;
    Ok(Json(ReviewDetail { review, images }))
}

#[instrument(skip(state, admin, draft), fields(admin_id = %admin.id))]
async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(draft): Json<ReviewDraft>,
) -> Result<Json<Review>> {
    let draft = draft.normalize()?;
    Ok(Json(
        ReviewRepository::new(state.pool()).update(id, &draft).await?,
    ))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    ReviewRepository::new(state.pool()).delete(id).await?;
    tracing::info!(review_id = %id, "Review deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
async fn add_image(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
    Json(req): Json<ImageRequest>,
) -> Result<(StatusCode, Json<Image>)> {
    let url = validate_image_url(&req.url)?;
    let image = ImageRepository::new(state.pool())
        .create(id, &url, Some(admin.id))
        .await?;
    Ok((StatusCode::CREATED, Json(image)))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
async fn delete_image(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<ImageId>,
) -> Result<StatusCode> {
    ImageRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
