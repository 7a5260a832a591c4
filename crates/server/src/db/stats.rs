//! Aggregate counters for the admin dashboard.

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use super::RepositoryError;

/// Counter key for the number of shops.
pub const SHOPS_KEY: &str = "shops";

/// Dashboard statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    /// Maintained shop counter.
    pub shops: i64,
    pub reviews: i64,
    pub users: i64,
    pub unused_invite_codes: i64,
}

/// Add `delta` to a counter, creating it if missing.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn adjust(conn: &mut PgConnection, key: &str, delta: i64) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO stats (key, value) VALUES ($1, GREATEST($2, 0)) \
         ON CONFLICT (key) DO UPDATE SET value = GREATEST(stats.value + $2, 0)",
    )
    .bind(key)
    .bind(delta)
    .execute(conn)
    .await?;
    Ok(())
}

/// Repository for statistics.
pub struct StatsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StatsRepository<'a> {
    /// Create a new stats repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Read the shop counter and count the other tables.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self) -> Result<Stats, RepositoryError> {
        let (shops, reviews, users, unused_invite_codes): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
                COALESCE((SELECT value FROM stats WHERE key = $1), 0), \
                (SELECT COUNT(*) FROM review), \
                (SELECT COUNT(*) FROM app_user), \
                (SELECT COUNT(*) FROM invite_code WHERE NOT used)",
        )
        .bind(SHOPS_KEY)
        .fetch_one(self.pool)
        .await?;

        Ok(Stats {
            shops,
            reviews,
            users,
            unused_invite_codes,
        })
    }

    /// Reset the shop counter to the actual number of shops.
    ///
    /// Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recount_shops(&self) -> Result<i64, RepositoryError> {
        let value: i64 = sqlx::query_scalar(
            "INSERT INTO stats (key, value) VALUES ($1, (SELECT COUNT(*) FROM shop)) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value \
             RETURNING value",
        )
        .bind(SHOPS_KEY)
        .fetch_one(self.pool)
        .await?;
        Ok(value)
    }
}
