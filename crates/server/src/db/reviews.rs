//! Review repository.
//!
//! Reviews carry a copy of their author's display name, avatar and role so
//! listings need no join on `app_user`. The copy is written on create and
//! kept current by `services::profile_sync`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use ramen_map_core::pagination::{Page, PageRequest, SortKey};
use ramen_map_core::{
    ReservationType, ReviewDraft, ReviewId, ReviewItem, Scores, ShopId, UserId, UserRole,
};

use super::{RepositoryError, User, push_keyset};

/// Denormalized author fields stored on each review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewAuthor {
    /// `None` once the author's account has been deleted.
    pub user_id: Option<UserId>,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

impl From<&User> for ReviewAuthor {
    fn from(user: &User) -> Self {
        Self {
            user_id: Some(user.id),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
        }
    }
}

/// A stored review.
#[derive(Debug, Clone, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub shop_id: ShopId,
    pub shop_name: String,
    pub author: ReviewAuthor,
    pub visit_date: NaiveDate,
    pub party_size: i16,
    pub reservation: ReservationType,
    pub items: Vec<ReviewItem>,
    pub scores: Scores,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Pagination key.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.created_at, self.id.as_i32())
    }

    /// Returns true if `user` wrote this review.
    #[must_use]
    pub fn is_authored_by(&self, user: UserId) -> bool {
        self.author.user_id == Some(user)
    }
}

/// Review count and average overall score for a shop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReviewSummary {
    pub count: i64,
    pub average_overall: Option<f64>,
}

/// Filters for listing reviews. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub tokens: Vec<String>,
    pub shop_id: Option<ShopId>,
    pub user_id: Option<UserId>,
}

#[derive(Debug, sqlx::FromRow)]
struct ReviewRow {
    id: i32,
    shop_id: i32,
    shop_name: String,
    user_id: Option<i32>,
    user_display_name: String,
    user_avatar_url: Option<String>,
    user_role: UserRole,
    visit_date: NaiveDate,
    party_size: i16,
    reservation: ReservationType,
    items: Json<Vec<ReviewItem>>,
    scores: Json<Scores>,
    notes: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            shop_id: ShopId::new(row.shop_id),
            shop_name: row.shop_name,
            author: ReviewAuthor {
                user_id: row.user_id.map(UserId::new),
                display_name: row.user_display_name,
                avatar_url: row.user_avatar_url,
                role: row.user_role,
            },
            visit_date: row.visit_date,
            party_size: row.party_size,
            reservation: row.reservation,
            items: row.items.0,
            scores: row.scores.0,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const REVIEW_SELECT: &str = "SELECT r.id, r.shop_id, s.name AS shop_name, r.user_id, \
     r.user_display_name, r.user_avatar_url, r.user_role, r.visit_date, r.party_size, \
     r.reservation, r.items, r.scores, r.notes, r.created_at, r.updated_at \
     FROM review r JOIN shop s ON s.id = r.shop_id";

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a review by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ReviewId) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Review::from))
    }

    /// List reviews newest first, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(tokens = filter.tokens.len()))]
    pub async fn list(
        &self,
        filter: &ReviewFilter,
        page: &PageRequest,
    ) -> Result<Page<Review>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("{REVIEW_SELECT} WHERE TRUE"));
        if !filter.tokens.is_empty() {
            qb.push(" AND r.search_tokens @> ")
                .push_bind(filter.tokens.clone());
        }
        if let Some(shop_id) = filter.shop_id {
            qb.push(" AND r.shop_id = ").push_bind(shop_id);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND r.user_id = ").push_bind(user_id);
        }
        push_keyset(&mut qb, "r", page);

        let rows = qb
            .build_query_as::<ReviewRow>()
            .fetch_all(self.pool)
            .await?;
        let reviews = rows.into_iter().map(Review::from).collect();
        Ok(Page::from_rows(reviews, page, Review::sort_key))
    }

    /// Review count and average overall score of a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary_for_shop(&self, shop_id: ShopId) -> Result<ReviewSummary, RepositoryError> {
        let (count, average): (i64, Option<f64>) = sqlx::query_as(
            "SELECT COUNT(*), ROUND(AVG(overall_score)::NUMERIC, 1)::DOUBLE PRECISION \
             FROM review WHERE shop_id = $1",
        )
        .bind(shop_id)
        .fetch_one(self.pool)
        .await?;

        Ok(ReviewSummary {
            count,
            average_overall: average,
        })
    }

    /// Create a review with the given author fields.
    ///
    /// The draft must already be normalized.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, draft, author), fields(shop_id = %draft.shop_id))]
    pub async fn create(
        &self,
        draft: &ReviewDraft,
        author: &ReviewAuthor,
    ) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let shop_name = shop_name(&mut tx, draft.shop_id).await?;
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO review (shop_id, user_id, user_display_name, user_avatar_url, user_role, \
                                 visit_date, party_size, reservation, items, scores, \
                                 overall_score, notes, search_tokens) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING id",
        )
        .bind(draft.shop_id)
        .bind(author.user_id)
        .bind(&author.display_name)
        .bind(&author.avatar_url)
        .bind(author.role)
        .bind(draft.visit_date)
        .bind(draft.party_size)
        .bind(draft.reservation)
        .bind(Json(&draft.items))
        .bind(Json(&draft.scores))
        .bind(draft.scores.overall)
        .bind(&draft.notes)
        .bind(draft.search_tokens(&shop_name))
        .fetch_one(&mut *tx)
        .await?;

        let review = fetch_in(&mut tx, ReviewId::new(id)).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Replace a review's visit details, items, scores and notes.
    ///
    /// Author fields are left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review or shop doesn't exist.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: ReviewId, draft: &ReviewDraft) -> Result<Review, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let shop_name = shop_name(&mut tx, draft.shop_id).await?;
        let result = sqlx::query(
            "UPDATE review SET shop_id = $2, visit_date = $3, party_size = $4, reservation = $5, \
                               items = $6, scores = $7, overall_score = $8, notes = $9, \
                               search_tokens = $10, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(draft.shop_id)
        .bind(draft.visit_date)
        .bind(draft.party_size)
        .bind(draft.reservation)
        .bind(Json(&draft.items))
        .bind(Json(&draft.scores))
        .bind(draft.scores.overall)
        .bind(&draft.notes)
        .bind(draft.search_tokens(&shop_name))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let review = fetch_in(&mut tx, id).await?;
        tx.commit().await?;
        Ok(review)
    }

    /// Delete a review (its images cascade).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Copy current author fields from `app_user` onto every linked review,
    /// then recompute every review's search tokens.
    ///
    /// Returns the number of reviews whose tokens were rewritten.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn reindex_all(&self) -> Result<u64, RepositoryError> {
        let refreshed = sqlx::query(
            "UPDATE review r SET user_display_name = u.display_name, \
                                 user_avatar_url = u.avatar_url, user_role = u.role \
             FROM app_user u WHERE r.user_id = u.id",
        )
        .execute(self.pool)
        .await?
        .rows_affected();
        tracing::info!(refreshed, "Refreshed review author fields");

        let rows = sqlx::query_as::<_, ReviewRow>(REVIEW_SELECT)
            .fetch_all(self.pool)
            .await?;

        let mut updated = 0;
        for review in rows.into_iter().map(Review::from) {
            write_tokens(self.pool, review).await?;
            updated += 1;
        }
        Ok(updated)
    }
}

impl From<Review> for ReviewDraft {
    fn from(review: Review) -> Self {
        Self {
            shop_id: review.shop_id,
            visit_date: review.visit_date,
            party_size: review.party_size,
            reservation: review.reservation,
            items: review.items,
            scores: review.scores,
            notes: review.notes,
        }
    }
}

async fn write_tokens<'e, E>(executor: E, review: Review) -> Result<(), RepositoryError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = review.id;
    let shop_name = review.shop_name.clone();
    let tokens = ReviewDraft::from(review).search_tokens(&shop_name);
    sqlx::query("UPDATE review SET search_tokens = $2 WHERE id = $1")
        .bind(id)
        .bind(tokens)
        .execute(executor)
        .await?;
    Ok(())
}

/// Recompute search tokens for every review of one shop, using the shop's
/// current name. Returns the number of reviews rewritten.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn retokenize_for_shop_in(
    conn: &mut PgConnection,
    shop_id: ShopId,
) -> Result<u64, RepositoryError> {
    let rows = sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.shop_id = $1"))
        .bind(shop_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut updated = 0;
    for review in rows.into_iter().map(Review::from) {
        write_tokens(&mut *conn, review).await?;
        updated += 1;
    }
    Ok(updated)
}

async fn shop_name(conn: &mut PgConnection, shop_id: ShopId) -> Result<String, RepositoryError> {
    sqlx::query_scalar("SELECT name FROM shop WHERE id = $1")
        .bind(shop_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

async fn fetch_in(conn: &mut PgConnection, id: ReviewId) -> Result<Review, RepositoryError> {
    sqlx::query_as::<_, ReviewRow>(&format!("{REVIEW_SELECT} WHERE r.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .map(Review::from)
        .ok_or(RepositoryError::NotFound)
}
