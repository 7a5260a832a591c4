//! Authentication route handlers.
//!
//! Email/password accounts with invite-code registration. The session cookie
//! carries a `CurrentUser`; API tokens for the places proxy are issued to a
//! signed-in session.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Deserializer};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::users::ProfileUpdate;
use crate::db::User;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireUser, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::IssuedToken;
use crate::services::{AuthService, ProfileService};
use crate::state::AppState;

use super::reviews::load_user;

// =============================================================================
// Request Types
// =============================================================================

/// Registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub invite_code: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Profile change. Omitted fields are left alone; `"avatar_url": null` clears
/// the avatar.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub avatar_url: Option<Option<String>>,
}

/// Distinguish a field sent as `null` from one that is absent.
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<ProfileRequest> for ProfileUpdate {
    fn from(req: ProfileRequest) -> Self {
        Self {
            display_name: req.display_name,
            avatar_url: req.avatar_url,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn sign_in(session: &Session, user: &User) -> Result<()> {
    // New session ID on privilege change.
    session.cycle_id().await?;
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account with an invite code and sign it in.
#[instrument(skip(state, session, req), fields(email = %req.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = AuthService::new(state.pool())
        .register(&req.email, &req.password, &req.display_name, &req.invite_code)
        .await?;

    sign_in(&session, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Sign in with email and password.
#[instrument(skip(state, session, req))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<User>> {
    let user = match AuthService::new(state.pool())
        .login(&req.email, &req.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            return Err(e.into());
        }
    };

    sign_in(&session, &user).await?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(user))
}

/// Sign out.
pub async fn logout(session: Session) -> Result<StatusCode> {
    clear_current_user(&session).await?;
    session.flush().await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// The signed-in user's current profile.
#[instrument(skip(state, current))]
pub async fn me(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<Json<User>> {
    Ok(Json(load_user(&state, current.id).await?))
}

/// Change display name or avatar; the change is copied onto the user's reviews.
#[instrument(skip(state, session, current, req), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireUser(current): RequireUser,
    Json(req): Json<ProfileRequest>,
) -> Result<Json<User>> {
    let user = ProfileService::new(state.pool())
        .update_profile(current.id, req.into())
        .await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    Ok(Json(user))
}

/// Issue a Bearer token for the places proxy.
#[instrument(skip(state, current), fields(user_id = %current.id))]
pub async fn issue_token(
    State(state): State<AppState>,
    RequireUser(current): RequireUser,
) -> Result<(StatusCode, Json<IssuedToken>)> {
    let token = AuthService::new(state.pool())
        .issue_api_token(current.id)
        .await?;
    Ok((StatusCode::CREATED, Json(token)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_request_distinguishes_null_and_absent() {
        let absent: ProfileRequest = serde_json::from_str(r#"{"display_name": "Hanako"}"#).unwrap();
        assert_eq!(absent.avatar_url, None);

        let cleared: ProfileRequest = serde_json::from_str(r#"{"avatar_url": null}"#).unwrap();
        assert_eq!(cleared.avatar_url, Some(None));

        let set: ProfileRequest =
            serde_json::from_str(r#"{"avatar_url": "https://example.com/a.png"}"#).unwrap();
        assert_eq!(
            set.avatar_url,
            Some(Some("https://example.com/a.png".to_owned()))
        );
    }
}
