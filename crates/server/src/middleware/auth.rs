//! Authentication middleware and extractors.
//!
//! - `RequireUser` / `OptionalUser` read the signed-in user from the session.
//! - `RequireAdmin` also re-reads the user's role from the database, so a
//!   demoted admin loses access without signing out.
//! - `RequireBearer` authenticates the places proxy with an API token.

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderValue, StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use ramen_map_core::UserId;

use crate::db::{User, UserRepository};
use crate::models::{CurrentUser, session_keys};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Where browsers are sent when a page needs a signed-in user.
const LOGIN_REDIRECT: &str = "/?login=required";

/// Returns true for JSON endpoints (`/api/...` and `/admin/api/...`).
///
/// Nested routers see a stripped URI, so the original one is preferred.
fn is_api_path(parts: &Parts) -> bool {
    let path = parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path());
    path.starts_with("/api/") || path.starts_with("/admin/api/")
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

/// Extractor that requires a signed-in user.
///
/// ```rust,ignore
/// async fn handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Status plus message, as `{"error": message}` for API paths and plain text
/// for pages.
fn error_response(status: StatusCode, message: &'static str, api: bool) -> Response {
    if api {
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    } else {
        (status, message).into_response()
    }
}

/// Rejection for the session extractors.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to the sign-in prompt (HTML requests).
    RedirectToLogin,
    /// 401 (API requests).
    Unauthorized,
    /// Signed in but not an admin.
    Forbidden { api: bool },
    /// The role check could not reach the database.
    Unavailable { api: bool },
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_REDIRECT).into_response(),
            Self::Unauthorized => error_response(StatusCode::UNAUTHORIZED, "Please sign in", true),
            Self::Forbidden { api } => {
                error_response(StatusCode::FORBIDDEN, "Admin access required", api)
            }
            Self::Unavailable { api } => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                api,
            ),
        }
    }
}

impl AuthRejection {
    fn missing_session(parts: &Parts) -> Self {
        if is_api_path(parts) {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        session_user(parts)
            .await
            .map(Self)
            .ok_or_else(|| AuthRejection::missing_session(parts))
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Extractor that requires a signed-in admin, checked against the database.
///
/// Yields the freshly loaded user row.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = session_user(parts)
            .await
            .ok_or_else(|| AuthRejection::missing_session(parts))?;

        let user = UserRepository::new(state.pool())
            .get_by_id(current.id)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load user for admin check");
                AuthRejection::Unavailable {
                    api: is_api_path(parts),
                }
            })?
            .ok_or_else(|| AuthRejection::missing_session(parts))?;

        if !user.role.is_admin() {
            tracing::warn!(user_id = %user.id, "Non-admin denied admin access");
            return Err(AuthRejection::Forbidden {
                api: is_api_path(parts),
            });
        }

        Ok(Self(user))
    }
}

/// Extractor that requires `Authorization: Bearer <token>`.
///
/// Yields the token owner's ID.
pub struct RequireBearer(pub UserId);

/// Rejection for `RequireBearer`.
#[derive(Debug)]
pub enum BearerRejection {
    /// Header missing, malformed, or token unknown/expired.
    Unauthorized,
    /// The token lookup could not reach the database.
    Unavailable,
}

impl IntoResponse for BearerRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => {
                let mut response = error_response(
                    StatusCode::UNAUTHORIZED,
                    "Missing or invalid API token",
                    true,
                );
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            Self::Unavailable => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable",
                true,
            ),
        }
    }
}

/// The token part of a `Bearer` authorization header.
#[must_use]
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for RequireBearer {
    type Rejection = BearerRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(BearerRejection::Unauthorized)?;

        match AuthService::new(state.pool())
            .authenticate_api_token(token)
            .await
        {
            Ok(user_id) => Ok(Self(user_id)),
            Err(AuthError::SessionExpired) => Err(BearerRejection::Unauthorized),
            Err(e) => {
                tracing::error!(error = %e, "API token lookup failed");
                Err(BearerRejection::Unavailable)
            }
        }
    }
}

/// Store the signed-in user in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
        assert_eq!(bearer_token("bearer  abc123 "), Some("abc123"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_rejections_use_error_json() {
        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "Please sign in");

        let response = AuthRejection::Forbidden { api: true }.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "Admin access required");

        let response = BearerRejection::Unauthorized.into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
        assert_eq!(body_json(response).await["error"], "Missing or invalid API token");
    }

    #[tokio::test]
    async fn test_page_rejection_is_plain_text() {
        let response = AuthRejection::Forbidden { api: false }.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
