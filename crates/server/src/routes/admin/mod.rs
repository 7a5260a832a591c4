//! Admin pages and JSON API.
//!
//! Every handler takes `RequireAdmin`, which re-reads the role from the
//! database on each request.
//!
//! # Route Structure
//!
//! ```text
//! GET    /admin                              - Dashboard page
//! GET    /admin/api/stats                    - Counters
//!
//! GET    /admin/api/shops?q=&limit=&cursor=  - List shops
//! POST   /admin/api/shops                    - Create shop
//! GET    /admin/api/shops/{id}               - Shop detail
//! PUT    /admin/api/shops/{id}               - Replace shop
//! DELETE /admin/api/shops/{id}               - Delete shop and its reviews
//!
//! GET    /admin/api/reviews?q=&shop_id=&...  - List reviews
//! POST   /admin/api/reviews                  - Create review as the admin
//! GET    /admin/api/reviews/{id}             - Review detail
//! PUT    /admin/api/reviews/{id}             - Replace review
//! DELETE /admin/api/reviews/{id}             - Delete review
//! POST   /admin/api/reviews/{id}/images      - Attach image URL
//! DELETE /admin/api/images/{id}              - Remove image
//!
//! GET    /admin/api/users?q=&limit=&cursor=  - List users
//! PATCH  /admin/api/users/{id}               - Change role / verification
//! DELETE /admin/api/users/{id}               - Delete user, anonymize reviews
//!
//! GET    /admin/api/invite-codes             - List codes
//! POST   /admin/api/invite-codes             - Generate codes
//! DELETE /admin/api/invite-codes/{id}        - Delete an unused code
//! ```

pub mod dashboard;
pub mod invites;
pub mod reviews;
pub mod shops;
pub mod users;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the JSON API router mounted at `/admin/api`.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(dashboard::stats))
        .merge(shops::router())
        .merge(reviews::router())
        .merge(users::router())
        .merge(invites::router())
}

/// Create the admin router mounted at `/admin`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .nest("/api", api_router())
}
