//! Bearer tokens for the places routes.
//!
//! Only the SHA-256 hash of a token is stored; the raw value is shown to the
//! client once when issued.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ramen_map_core::{ApiTokenId, UserId};

use super::RepositoryError;

/// Repository for API tokens.
pub struct ApiTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ApiTokenRepository<'a> {
    /// Create a new API token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a token hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<ApiTokenId, RepositoryError> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO api_token (user_id, token_hash, expires_at) VALUES ($1, $2, $3) \
             RETURNING id",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(ApiTokenId::new(id))
    }

    /// Owner of an unexpired token with this hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_owner(&self, token_hash: &str) -> Result<Option<UserId>, RepositoryError> {
        let user_id: Option<i32> = sqlx::query_scalar(
            "SELECT user_id FROM api_token WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(user_id.map(UserId::new))
    }

    /// Remove expired tokens. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM api_token WHERE expires_at <= NOW()")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
