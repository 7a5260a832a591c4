//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                    - Map page
//!
//! # Public API
//! GET  /api/shops?q=&country=&tag=&limit=&cursor=
//! GET  /api/shops/map?north=&south=&east=&west=
//! GET  /api/shops/{id}
//! GET  /api/shops/{id}/reviews?limit=&cursor=
//! GET  /api/reviews?q=&limit=&cursor=
//! GET  /api/reviews/{id}
//!
//! # Signed-in users
//! POST   /api/reviews
//! PUT    /api/reviews/{id}
//! DELETE /api/reviews/{id}
//!
//! # Auth (session cookie)
//! POST /api/auth/register
//! POST /api/auth/login
//! POST /api/auth/logout
//! GET  /api/auth/me
//! PUT  /api/auth/profile
//! POST /api/auth/token
//!
//! # Places proxy (Bearer token)
//! POST /api/places/search
//! POST /api/places/nearest-station
//!
//! # Admin (see `admin`)
//! GET  /admin
//! ...  /admin/api/*
//! ```

pub mod admin;
pub mod auth;
pub mod home;
pub mod places;
pub mod reviews;
pub mod shops;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Deserialize;

use ramen_map_core::pagination::PageRequest;
use ramen_map_core::search::query_tokens;

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter, places_rate_limiter};
use crate::state::AppState;

/// Query parameters shared by the paginated list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Free-text search; blank means no filter.
    pub q: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl ListQuery {
    /// Page size and position.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an undecodable cursor.
    pub fn page(&self) -> Result<PageRequest, AppError> {
        Ok(PageRequest::from_query(self.limit, self.cursor.as_deref())?)
    }

    /// Tokens that must all match.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        self.q.as_deref().map(query_tokens).unwrap_or_default()
    }
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/profile", put(auth::update_profile))
        .route("/token", post(auth::issue_token))
        .merge(limited)
}

/// Create the shop routes router.
pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(shops::index))
        .route("/map", get(shops::map))
        .route("/{id}", get(shops::show))
        .route("/{id}/reviews", get(shops::reviews))
}

/// Create the review routes router.
pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(reviews::index).post(reviews::create))
        .route(
            "/{id}",
            get(reviews::show)
                .put(reviews::update)
                .delete(reviews::delete),
        )
}

/// Create the places proxy router.
pub fn places_routes() -> Router<AppState> {
    Router::new()
        .route("/search", post(places::search))
        .route("/nearest-station", post(places::nearest_station))
        .layer(places_rate_limiter())
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .nest("/shops", shop_routes())
        .nest("/reviews", review_routes())
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes())
        .nest("/places", places_routes());

    Router::new()
        .route("/", get(home::index))
        .nest("/api", api)
        .nest("/admin", admin::routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery::default();
        let page = query.page().unwrap();
        assert_eq!(page.limit, 20);
        assert!(page.cursor.is_none());
        assert!(query.tokens().is_empty());
    }

    #[test]
    fn test_list_query_clamps_limit_and_tokenizes() {
        let query = ListQuery {
            q: Some("Tonkotsu  Shibuya".to_owned()),
            limit: Some(1000),
            cursor: Some(String::new()),
        };
        assert_eq!(query.page().unwrap().limit, 100);
        assert_eq!(query.tokens(), vec!["tonkotsu", "shibuya"]);
    }

    #[test]
    fn test_list_query_rejects_bad_cursor() {
        let query = ListQuery {
            cursor: Some("%%%".to_owned()),
            ..ListQuery::default()
        };
        assert!(matches!(query.page(), Err(AppError::BadRequest(_))));
    }
}
