//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry and logged; clients only ever see a short message
//! suitable for a toast, as `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use ramen_map_core::pagination::CursorError;
use ramen_map_core::{GeoError, ReviewError, ShopError};

use crate::db::RepositoryError;
use crate::places::PlacesError;
use crate::services::{AuthError, ProfileError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Profile update failed.
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Google Maps call failed.
    #[error("Places error: {0}")]
    Places(#[from] PlacesError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ShopError> for AppError {
    fn from(e: ShopError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<ReviewError> for AppError {
    fn from(e: ReviewError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<GeoError> for AppError {
    fn from(e: GeoError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<CursorError> for AppError {
    fn from(_: CursorError) -> Self {
        Self::BadRequest("invalid cursor".to_owned())
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => repository_status(err),
            Self::Profile(err) => match err {
                ProfileError::Repository(err) => repository_status(err),
                ProfileError::InvalidDisplayName(_) | ProfileError::InvalidAvatarUrl => {
                    StatusCode::BAD_REQUEST
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::SessionExpired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::InvalidDisplayName(_)
                | AuthError::InvalidInviteCode => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Places(PlacesError::InvalidInput(_)) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Places(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(err) | Self::Auth(AuthError::Repository(err)) => {
                repository_message(err)
            }
            Self::Profile(err) => match err {
                ProfileError::Repository(err) => repository_message(err),
                other => other.to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_owned(),
                AuthError::UserAlreadyExists => "This email is already in use".to_owned(),
                AuthError::WeakPassword(msg) | AuthError::InvalidDisplayName(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::InvalidInviteCode => {
                    "Invalid or already used invite code".to_owned()
                }
                AuthError::SessionExpired => "Session expired, please sign in again".to_owned(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_owned()
                }
            },
            Self::Places(PlacesError::InvalidInput(msg)) => msg.clone(),
            Self::Places(_) => "Google Maps request failed".to_owned(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Unauthorized(msg) | Self::Forbidden(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn repository_message(err: &RepositoryError) -> String {
    match err {
        RepositoryError::NotFound => "Not found".to_owned(),
        RepositoryError::Conflict(msg) => msg.clone(),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            "Internal server error".to_owned()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(serde_json::json!({ "error": self.user_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// ```rust,ignore
/// add_breadcrumb("review", "Created review", Some(&[("shop_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Shop".to_string());
        assert_eq!(err.to_string(), "Not found: Shop");
        assert_eq!(err.user_message(), "Shop not found");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("Shop".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("nope".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::Conflict("x".into()))),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_auth_errors_map_to_toast_messages() {
        let cases = [
            (
                AuthError::InvalidCredentials,
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ),
            (
                AuthError::UserAlreadyExists,
                StatusCode::CONFLICT,
                "This email is already in use",
            ),
            (
                AuthError::InvalidInviteCode,
                StatusCode::BAD_REQUEST,
                "Invalid or already used invite code",
            ),
            (
                AuthError::SessionExpired,
                StatusCode::UNAUTHORIZED,
                "Session expired, please sign in again",
            ),
        ];
        for (err, status, message) in cases {
            let err = AppError::Auth(err);
            assert_eq!(err.status(), status);
            assert_eq!(err.user_message(), message);
        }
    }

    #[test]
    fn test_upstream_failure_is_bad_gateway_without_details() {
        let err = AppError::Places(PlacesError::Api {
            status: "REQUEST_DENIED".into(),
            message: "key AIza... is invalid".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(!err.user_message().contains("AIza"));
    }

    #[test]
    fn test_validation_errors_are_bad_request() {
        assert_eq!(
            AppError::from(ReviewError::NoRamenItem).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(ShopError::EmptyName).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
