//! Invite code repository.
//!
//! A code moves one way from unused to used. Consumption is a single
//! conditional `UPDATE`, so two registrations racing for the same code
//! cannot both succeed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use ramen_map_core::{InviteCode, InviteCodeId, UserId};

use super::{RepositoryError, conflict_on_unique};

/// Attempts at generating an unused code before giving up.
const MAX_GENERATE_ATTEMPTS: usize = 5;

/// A stored invite code.
#[derive(Debug, Clone, Serialize)]
pub struct InviteCodeRecord {
    pub id: InviteCodeId,
    pub code: String,
    pub created_by: Option<UserId>,
    pub used: bool,
    pub used_by: Option<UserId>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct InviteCodeRow {
    id: i32,
    code: String,
    created_by: Option<i32>,
    used: bool,
    used_by: Option<i32>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<InviteCodeRow> for InviteCodeRecord {
    fn from(row: InviteCodeRow) -> Self {
        Self {
            id: InviteCodeId::new(row.id),
            code: row.code,
            created_by: row.created_by.map(UserId::new),
            used: row.used,
            used_by: row.used_by.map(UserId::new),
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for invite code database operations.
pub struct InviteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InviteRepository<'a> {
    /// Create a new invite repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all codes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<InviteCodeRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, InviteCodeRow>(
            "SELECT id, code, created_by, used, used_by, used_at, created_at \
             FROM invite_code ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Generate and store `count` new codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no unused code could be generated.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create_many(
        &self,
        count: usize,
        created_by: Option<UserId>,
    ) -> Result<Vec<InviteCodeRecord>, RepositoryError> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            created.push(self.create_one(created_by).await?);
        }
        Ok(created)
    }

    async fn create_one(
        &self,
        created_by: Option<UserId>,
    ) -> Result<InviteCodeRecord, RepositoryError> {
        let mut last_err = RepositoryError::Conflict("invite code already exists".to_owned());
        for _ in 0..MAX_GENERATE_ATTEMPTS {
            let code = InviteCode::generate(&mut rand::rng());
            let result = sqlx::query_as::<_, InviteCodeRow>(
                "INSERT INTO invite_code (code, created_by) VALUES ($1, $2) \
                 RETURNING id, code, created_by, used, used_by, used_at, created_at",
            )
            .bind(code.as_str())
            .bind(created_by)
            .fetch_one(self.pool)
            .await;

            match result {
                Ok(row) => return Ok(row.into()),
                Err(e) => match conflict_on_unique(e, "invite code") {
                    conflict @ RepositoryError::Conflict(_) => last_err = conflict,
                    other => return Err(other),
                },
            }
        }
        Err(last_err)
    }

    /// Delete a code that has not been used.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the code doesn't exist.
    /// Returns `RepositoryError::Conflict` if the code was already used.
    pub async fn delete_unused(&self, id: InviteCodeId) -> Result<(), RepositoryError> {
        let used: Option<bool> = sqlx::query_scalar(
            "WITH deleted AS (DELETE FROM invite_code WHERE id = $1 AND NOT used RETURNING id) \
             SELECT used FROM invite_code WHERE id = $1 \
             UNION ALL SELECT FALSE FROM deleted",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match used {
            None => Err(RepositoryError::NotFound),
            Some(true) => Err(RepositoryError::Conflict(
                "invite code has already been used".to_owned(),
            )),
            Some(false) => Ok(()),
        }
    }
}

/// Mark an unused code as used. Returns `None` if the code is unknown or
/// already used.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn consume_in(
    conn: &mut PgConnection,
    code: &InviteCode,
) -> Result<Option<InviteCodeId>, RepositoryError> {
    let id: Option<i32> = sqlx::query_scalar(
        "UPDATE invite_code SET used = TRUE, used_at = NOW() \
         WHERE code = $1 AND NOT used \
         RETURNING id",
    )
    .bind(code.as_str())
    .fetch_optional(conn)
    .await?;

    Ok(id.map(InviteCodeId::new))
}

/// Record which user consumed a code.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_used_by_in(
    conn: &mut PgConnection,
    id: InviteCodeId,
    user: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE invite_code SET used_by = $2 WHERE id = $1")
        .bind(id)
        .bind(user)
        .execute(conn)
        .await?;
    Ok(())
}
