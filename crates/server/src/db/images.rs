//! Review image records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use ramen_map_core::{ImageId, ReviewId, UserId};

use super::RepositoryError;

/// An image attached to a review.
#[derive(Debug, Clone, Serialize)]
pub struct Image {
    pub id: ImageId,
    pub review_id: Option<ReviewId>,
    pub url: String,
    pub uploaded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i32,
    review_id: Option<i32>,
    url: String,
    uploaded_by: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for Image {
    fn from(row: ImageRow) -> Self {
        Self {
            id: ImageId::new(row.id),
            review_id: row.review_id.map(ReviewId::new),
            url: row.url,
            uploaded_by: row.uploaded_by.map(UserId::new),
            created_at: row.created_at,
        }
    }
}

/// Repository for review images.
pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    /// Create a new image repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Images of a review in upload order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_review(&self, review_id: ReviewId) -> Result<Vec<Image>, RepositoryError> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT id, review_id, url, uploaded_by, created_at FROM image \
             WHERE review_id = $1 ORDER BY created_at, id",
        )
        .bind(review_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Attach an image URL to a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review doesn't exist.
    pub async fn create(
        &self,
        review_id: ReviewId,
        url: &str,
        uploaded_by: Option<UserId>,
    ) -> Result<Image, RepositoryError> {
        let row = sqlx::query_as::<_, ImageRow>(
            "INSERT INTO image (review_id, url, uploaded_by) \
             SELECT id, $2, $3 FROM review WHERE id = $1 \
             RETURNING id, review_id, url, uploaded_by, created_at",
        )
        .bind(review_id)
        .bind(url)
        .bind(uploaded_by)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        Ok(row.into())
    }

    /// Delete an image record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the image doesn't exist.
    pub async fn delete(&self, id: ImageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM image WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
