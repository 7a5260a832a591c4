//! Review endpoints.
//!
//! Anyone may read. Signed-in users create reviews under their own name;
//! only the author or an admin may change or delete one.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use ramen_map_core::pagination::Page;
use ramen_map_core::{ReviewDraft, ReviewId, UserId};

use super::ListQuery;
use crate::db::{
    Image, ImageRepository, Review, ReviewAuthor, ReviewFilter, ReviewRepository, User,
    UserRepository,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// A review with its photos.
#[derive(Debug, Serialize)]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    pub images: Vec<Image>,
}

/// Recent reviews, optionally filtered by `q`.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Review>>> {
    let page = query.page()?;
    let filter = ReviewFilter {
        tokens: query.tokens(),
        ..ReviewFilter::default()
    };
    let reviews = ReviewRepository::new(state.pool())
        .list(&filter, &page)
        .await?;
    Ok(Json(reviews))
}

/// Review detail with images.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ReviewId>,
) -> Result<Json<ReviewDetail>> {
    let review = find_review(&state, id).await?;
    let images = ImageRepository::new(state.pool())
        .list_for_review(id)
        .await?;
    Ok(Json(ReviewDetail { review, images }))
}

/// Create a review as the signed-in user.
#[instrument(skip(state, current, draft), fields(user_id = %current.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Json(draft): Json<ReviewDraft>,
) -> Result<(StatusCode, Json<Review>)> {
    let draft = draft.normalize()?;
    let user = load_user(&state, current.id).await?;

    let review = ReviewRepository::new(state.pool())
        .create(&draft, &ReviewAuthor::from(&user))
        .await?;

    tracing::info!(review_id = %review.id, shop_id = %review.shop_id, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

/// Replace a review's content.
#[instrument(skip(state, current, draft), fields(user_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ReviewId>,
    Json(draft): Json<ReviewDraft>,
) -> Result<Json<Review>> {
    let draft = draft.normalize()?;
    let review = find_review(&state, id).await?;
    let user = load_user(&state, current.id).await?;
    ensure_can_edit(&review, &user)?;

    let review = ReviewRepository::new(state.pool())
        .update(id, &draft)
        .await?;
    Ok(Json(review))
}

/// Delete a review.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
    Path(id): Path<ReviewId>,
) -> Result<StatusCode> {
    let review = find_review(&state, id).await?;
    let user = load_user(&state, current.id).await?;
    ensure_can_edit(&review, &user)?;

    ReviewRepository::new(state.pool()).delete(id).await?;
    tracing::info!(review_id = %id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn find_review(state: &AppState, id: ReviewId) -> Result<Review> {
    ReviewRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("review {id}")))
}

/// The session user as currently stored; a deleted account is signed out.
pub(crate) async fn load_user(state: &AppState, id: UserId) -> Result<User> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_owned()))
}

/// Authors may edit their own reviews; admins may edit any.
pub(crate) fn ensure_can_edit(review: &Review, user: &User) -> Result<()> {
    if review.is_authored_by(user.id) || user.role.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("you can only change your own reviews".to_owned()))
    }
}
