//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] ramen_map_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Display name empty or too long.
    #[error("invalid display name: {0}")]
    InvalidDisplayName(String),

    /// Invite code unknown, malformed or already used.
    #[error("invalid or used invite code")]
    InvalidInviteCode,

    /// Session missing or expired.
    #[error("session expired")]
    SessionExpired,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
