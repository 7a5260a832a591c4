//! Ramen Map web server library.
//!
//! The binary in `main.rs` wires configuration, logging and the database
//! pool; everything request-facing is built by [`app`] so router tests can
//! drive it without a listener.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod places;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Directory served at `/static`, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/server/static";

/// Build the full application router with its middleware stack.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
