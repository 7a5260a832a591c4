//! Database access for the Ramen Map `PostgreSQL` schema.
//!
//! # Tables
//!
//! - `shop` - Ramen shops with search tokens and business hours (JSONB)
//! - `review` - Reviews with denormalized author fields
//! - `image` - Review images
//! - `app_user` / `user_password` - Accounts and Argon2 password hashes
//! - `invite_code` - One-time registration codes
//! - `stats` - Maintained counters (`shops`)
//! - `api_token` - Hashed Bearer tokens for the places routes
//! - `session` - tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p ramen-map-cli -- migrate
//! ```
//!
//! Queries are checked at runtime (`query_as` with `FromRow` rows and
//! `QueryBuilder` for optional filters).

pub mod api_tokens;
pub mod images;
pub mod invites;
pub mod reviews;
pub mod shops;
pub mod stats;
pub mod users;

use std::time::Duration;

use ramen_map_core::pagination::{Direction, PageRequest};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;

pub use api_tokens::ApiTokenRepository;
pub use images::{Image, ImageRepository};
pub use invites::{InviteCodeRecord, InviteRepository};
pub use reviews::{Review, ReviewAuthor, ReviewFilter, ReviewRepository, ReviewSummary};
pub use shops::{Shop, ShopFilter, ShopRepository};
pub use stats::{Stats, StatsRepository};
pub use users::{User, UserRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Append the keyset condition, ordering and limit for a page request.
///
/// The query must already have a `WHERE` clause; rows are ordered by
/// `created_at DESC, id DESC`, or ascending for backward cursors.
pub(crate) fn push_keyset(qb: &mut QueryBuilder<'_, Postgres>, table: &str, page: &PageRequest) {
    if let Some(cursor) = page.cursor {
        let op = match cursor.direction {
            Direction::After => "<",
            Direction::Before => ">",
        };
        qb.push(format!(" AND ({table}.created_at, {table}.id) {op} ("))
            .push_bind(cursor.key.created_at)
            .push(", ")
            .push_bind(cursor.key.id)
            .push(")");
    }
    let order = if page.is_backward() { "ASC" } else { "DESC" };
    qb.push(format!(
        " ORDER BY {table}.created_at {order}, {table}.id {order} LIMIT "
    ))
    .push_bind(page.fetch_limit());
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Fixtures shared by the database tests.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use ramen_map_core::{
        AuthMethod, Email, GeoPoint, ItemKind, ReservationType, ReviewDraft, ReviewItem, Scores,
        ShopDraft, ShopId, UserRole,
    };

    use super::users::{self, NewUser};
    use super::{PgPool, ReviewAuthor, User};

    pub fn shop_draft(name: &str, google_place_id: Option<&str>) -> ShopDraft {
        ShopDraft {
            name: name.to_owned(),
            address: "1-1-7 Ebisu, Shibuya".to_owned(),
            location: GeoPoint {
                lat: 35.6467,
                lng: 139.7101,
            },
            country: "jp".to_owned(),
            region: Some("Tokyo".to_owned()),
            business_hours: ramen_map_core::BusinessHours::new(),
            tags: vec!["Shio".to_owned()],
            google_place_id: google_place_id.map(str::to_owned),
        }
        .normalize()
        .unwrap()
    }

    pub fn review_draft(shop_id: ShopId) -> ReviewDraft {
        ReviewDraft {
            shop_id,
            visit_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            party_size: 2,
            reservation: ReservationType::None,
            items: vec![ReviewItem {
                kind: ItemKind::Ramen,
                name: "Yuzu shio".to_owned(),
                price: None,
            }],
            scores: Scores {
                soup: Some(90.0),
                noodles: Some(80.0),
                ..Scores::default()
            },
            notes: "Light broth".to_owned(),
        }
        .normalize()
        .unwrap()
    }

    /// Author fields for a review with no account behind it.
    pub fn guest() -> ReviewAuthor {
        ReviewAuthor {
            user_id: None,
            display_name: "Guest".to_owned(),
            avatar_url: None,
            role: UserRole::Normal,
        }
    }

    pub async fn insert_user(pool: &PgPool, email: &str, display_name: &str) -> User {
        let email = Email::parse(email).unwrap();
        let mut conn = pool.acquire().await.unwrap();
        users::insert_with_password(
            &mut conn,
            &NewUser {
                email: &email,
                display_name,
                auth_method: AuthMethod::Email,
            },
            "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g",
        )
        .await
        .unwrap()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use ramen_map_core::pagination::{Cursor, SortKey};

    use super::*;

    #[test]
    fn test_keyset_first_page_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM shop WHERE TRUE");
        push_keyset(&mut qb, "shop", &PageRequest::default());
        assert_eq!(
            qb.sql(),
            "SELECT * FROM shop WHERE TRUE ORDER BY shop.created_at DESC, shop.id DESC LIMIT $1"
        );
    }

    #[test]
    fn test_keyset_backward_sql() {
        let key = SortKey::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap(), 4);
        let page = PageRequest {
            limit: 10,
            cursor: Some(Cursor::before(key)),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM review r WHERE TRUE");
        push_keyset(&mut qb, "r", &page);
        let sql = qb.sql();
        assert!(sql.contains("(r.created_at, r.id) > ($1, $2)"));
        assert!(sql.ends_with("ORDER BY r.created_at ASC, r.id ASC LIMIT $3"));
    }
}
