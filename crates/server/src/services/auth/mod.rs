//! Authentication service.
//!
//! Password sign-up (gated by an invite code), password login, and the
//! Bearer tokens used by the places proxy.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::instrument;

use ramen_map_core::{AuthMethod, Email, InviteCode, UserId};

use crate::db::api_tokens::ApiTokenRepository;
use crate::db::users::{self, NewUser, UserRepository};
use crate::db::{RepositoryError, User, invites};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum display name length in characters.
pub const MAX_DISPLAY_NAME_LENGTH: usize = 50;

/// Random bytes in a Bearer token.
const API_TOKEN_BYTES: usize = 32;

/// Bearer token lifetime.
const API_TOKEN_TTL_DAYS: i64 = 30;

/// A freshly issued Bearer token. The raw value is never stored.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user with email and password.
    ///
    /// The invite code is consumed in the same transaction that creates the
    /// account, so a failed sign-up leaves the code unused.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::InvalidDisplayName` if the display name is empty or too long.
    /// Returns `AuthError::InvalidInviteCode` if the code is unknown or already used.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password, invite_code))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        invite_code: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let display_name = validate_display_name(display_name)?;
        let code = InviteCode::parse(invite_code).ok_or(AuthError::InvalidInviteCode)?;

        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let invite_id = invites::consume_in(&mut tx, &code)
            .await?
            .ok_or(AuthError::InvalidInviteCode)?;

        let new_user = NewUser {
            email: &email,
            display_name: &display_name,
            auth_method: AuthMethod::Email,
        };
        let user = users::insert_with_password(&mut tx, &new_user, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        invites::set_used_by_in(&mut tx, invite_id, user.id).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Issue a new Bearer token for `user_id`, dropping expired ones first.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the token cannot be stored.
    pub async fn issue_api_token(&self, user_id: UserId) -> Result<IssuedToken, AuthError> {
        let token = generate_api_token();
        let expires_at = Utc::now() + Duration::days(API_TOKEN_TTL_DAYS);

        let tokens = ApiTokenRepository::new(self.pool);
        let pruned = tokens.delete_expired().await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Removed expired API tokens");
        }
        tokens
            .create(user_id, &hash_api_token(&token), expires_at)
            .await?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Resolve a Bearer token to its owner.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the token is unknown or expired.
    pub async fn authenticate_api_token(&self, token: &str) -> Result<UserId, AuthError> {
        ApiTokenRepository::new(self.pool)
            .find_owner(&hash_api_token(token))
            .await?
            .ok_or(AuthError::SessionExpired)
    }
}

/// Validate password requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Trim and check a display name.
///
/// # Errors
///
/// Returns `AuthError::InvalidDisplayName` if it is blank or too long.
pub fn validate_display_name(display_name: &str) -> Result<String, AuthError> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(AuthError::InvalidDisplayName(
            "display name is required".to_owned(),
        ));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(AuthError::InvalidDisplayName(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

fn generate_api_token() -> String {
    let mut bytes = [0u8; API_TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 of a raw token, hex encoded.
#[must_use]
pub fn hash_api_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
