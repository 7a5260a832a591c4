//! Shop repository.
//!
//! Every write regenerates the shop's search tokens, and a rename regenerates
//! the tokens of its reviews too. Creating and deleting a shop adjusts the
//! `shops` counter in the same transaction.
//!
//! Place-ID uniqueness is enforced by a partial unique index; the lookup
//! before each write only produces a clearer conflict message.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use ramen_map_core::pagination::{Page, PageRequest, SortKey};
use ramen_map_core::{Bounds, BusinessHours, GeoPoint, ShopDraft, ShopId};

use super::reviews::retokenize_for_shop_in;
use super::stats::{self, SHOPS_KEY};
use super::{RepositoryError, conflict_on_unique, push_keyset};

const PLACE_ID: &str = "Google place ID";

/// Most shops returned for one map viewport.
pub const MAX_MAP_SHOPS: i64 = 500;

/// A stored shop.
#[derive(Debug, Clone, Serialize)]
pub struct Shop {
    pub id: ShopId,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
    pub country: String,
    pub region: Option<String>,
    pub business_hours: BusinessHours,
    pub tags: Vec<String>,
    pub google_place_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    /// Pagination key.
    #[must_use]
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.created_at, self.id.as_i32())
    }
}

/// Filters for listing shops. Empty fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct ShopFilter {
    /// Tokens that must all be present (see `search::query_tokens`).
    pub tokens: Vec<String>,
    pub country: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: i32,
    name: String,
    address: String,
    lat: f64,
    lng: f64,
    country: String,
    region: Option<String>,
    business_hours: Json<BusinessHours>,
    tags: Vec<String>,
    google_place_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShopRow> for Shop {
    fn from(row: ShopRow) -> Self {
        Self {
            id: ShopId::new(row.id),
            name: row.name,
            address: row.address,
            location: GeoPoint {
                lat: row.lat,
                lng: row.lng,
            },
            country: row.country.trim().to_owned(),
            region: row.region,
            business_hours: row.business_hours.0,
            tags: row.tags,
            google_place_id: row.google_place_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SHOP_COLUMNS: &str = "shop.id, shop.name, shop.address, shop.lat, shop.lng, shop.country, \
     shop.region, shop.business_hours, shop.tags, shop.google_place_id, \
     shop.created_at, shop.updated_at";

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a shop by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shop WHERE shop.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Shop::from))
    }

    /// List shops newest first, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self), fields(tokens = filter.tokens.len()))]
    pub async fn list(
        &self,
        filter: &ShopFilter,
        page: &PageRequest,
    ) -> Result<Page<Shop>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SHOP_COLUMNS} FROM shop WHERE TRUE"
        ));
        if !filter.tokens.is_empty() {
            qb.push(" AND shop.search_tokens @> ")
                .push_bind(filter.tokens.clone());
        }
        if let Some(country) = &filter.country {
            qb.push(" AND shop.country = ")
                .push_bind(country.trim().to_ascii_uppercase());
        }
        if let Some(tag) = &filter.tag {
            qb.push(" AND shop.tags @> ARRAY[")
                .push_bind(tag.trim().to_lowercase())
                .push("]::TEXT[]");
        }
        push_keyset(&mut qb, "shop", page);

        let rows = qb.build_query_as::<ShopRow>().fetch_all(self.pool).await?;
        let shops = rows.into_iter().map(Shop::from).collect();
        Ok(Page::from_rows(shops, page, Shop::sort_key))
    }

    /// Shops inside a map viewport, at most [`MAX_MAP_SHOPS`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn in_bounds(&self, bounds: &Bounds) -> Result<Vec<Shop>, RepositoryError> {
        let lng_clause = if bounds.crosses_antimeridian() {
            "(shop.lng >= $3 OR shop.lng <= $4)"
        } else {
            "(shop.lng >= $3 AND shop.lng <= $4)"
        };
        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM shop \
             WHERE shop.lat BETWEEN $1 AND $2 AND {lng_clause} \
             ORDER BY shop.created_at DESC, shop.id DESC \
             LIMIT $5"
        ))
        .bind(bounds.south)
        .bind(bounds.north)
        .bind(bounds.west)
        .bind(bounds.east)
        .bind(MAX_MAP_SHOPS)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Shop::from).collect())
    }

    /// Create a shop and bump the shop counter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another shop has the same Google place ID.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &ShopDraft) -> Result<Shop, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        ensure_place_id_free(&mut tx, draft.google_place_id.as_deref(), None).await?;

        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "INSERT INTO shop (name, address, lat, lng, country, region, business_hours, \
                               tags, google_place_id, search_tokens) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.address)
        .bind(draft.location.lat)
        .bind(draft.location.lng)
        .bind(&draft.country)
        .bind(&draft.region)
        .bind(Json(&draft.business_hours))
        .bind(&draft.tags)
        .bind(&draft.google_place_id)
        .bind(draft.search_tokens())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, PLACE_ID))?;

        stats::adjust(&mut tx, SHOPS_KEY, 1).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// Replace a shop's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop doesn't exist.
    /// Returns `RepositoryError::Conflict` if another shop has the same Google place ID.
    #[instrument(skip(self, draft))]
    pub async fn update(&self, id: ShopId, draft: &ShopDraft) -> Result<Shop, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old_name: String = sqlx::query_scalar("SELECT name FROM shop WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        ensure_place_id_free(&mut tx, draft.google_place_id.as_deref(), Some(id)).await?;

        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "UPDATE shop SET name = $2, address = $3, lat = $4, lng = $5, country = $6, \
                             region = $7, business_hours = $8, tags = $9, \
                             google_place_id = $10, search_tokens = $11, updated_at = NOW() \
             WHERE shop.id = $1 \
             RETURNING {SHOP_COLUMNS}"
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.address)
        .bind(draft.location.lat)
        .bind(draft.location.lng)
        .bind(&draft.country)
        .bind(&draft.region)
        .bind(Json(&draft.business_hours))
        .bind(&draft.tags)
        .bind(&draft.google_place_id)
        .bind(draft.search_tokens())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, PLACE_ID))?
        .ok_or(RepositoryError::NotFound)?;

        if old_name != draft.name {
            let retokenized = retokenize_for_shop_in(&mut tx, id).await?;
            tracing::debug!(shop_id = %id, retokenized, "Shop renamed");
        }

        tx.commit().await?;
        Ok(row.into())
    }

    /// Delete a shop (its reviews cascade) and decrement the shop counter.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop doesn't exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ShopId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM shop WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        stats::adjust(&mut tx, SHOPS_KEY, -1).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Recompute search tokens for every shop. Returns the number updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn reindex_all(&self) -> Result<u64, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopRow>(&format!("SELECT {SHOP_COLUMNS} FROM shop"))
            .fetch_all(self.pool)
            .await?;

        let mut updated = 0;
        for shop in rows.into_iter().map(Shop::from) {
            let tokens = ShopDraft::from(shop.clone()).search_tokens();
            sqlx::query("UPDATE shop SET search_tokens = $2 WHERE id = $1")
                .bind(shop.id)
                .bind(tokens)
                .execute(self.pool)
                .await?;
            updated += 1;
        }
        Ok(updated)
    }
}

impl From<Shop> for ShopDraft {
    fn from(shop: Shop) -> Self {
        Self {
            name: shop.name,
            address: shop.address,
            location: shop.location,
            country: shop.country,
            region: shop.region,
            business_hours: shop.business_hours,
            tags: shop.tags,
            google_place_id: shop.google_place_id,
        }
    }
}

/// Reject a Google place ID already used by a different shop.
async fn ensure_place_id_free(
    conn: &mut PgConnection,
    place_id: Option<&str>,
    except: Option<ShopId>,
) -> Result<(), RepositoryError> {
    let Some(place_id) = place_id else {
        return Ok(());
    };

    let taken: Option<i32> = sqlx::query_scalar(
        "SELECT id FROM shop WHERE google_place_id = $1 AND ($2::INTEGER IS NULL OR id <> $2) \
         LIMIT 1",
    )
    .bind(place_id)
    .bind(except)
    .fetch_optional(conn)
    .await?;

    match taken {
        Some(other) => Err(RepositoryError::Conflict(format!(
            "Google place ID is already used by shop {other}"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ramen_map_core::search::query_tokens;
    use sqlx::PgPool;

    use super::*;
    use crate::db::test_support::{guest, review_draft, shop_draft};
    use crate::db::{ReviewFilter, ReviewRepository, StatsRepository};

    async fn shop_count(pool: &PgPool) -> i64 {
        StatsRepository::new(pool).get().await.unwrap().shops
    }

    async fn reviews_matching(pool: &PgPool, query: &str) -> usize {
        let filter = ReviewFilter {
            tokens: query_tokens(query),
            ..ReviewFilter::default()
        };
        ReviewRepository::new(pool)
            .list(&filter, &PageRequest::default())
            .await
            .unwrap()
            .items
            .len()
    }

    fn names(page: &Page<Shop>) -> Vec<&str> {
        page.items.iter().map(|s| s.name.as_str()).collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_and_delete_adjust_shop_counter(pool: PgPool) {
        let shops = ShopRepository::new(&pool);

        let afuri = shops.create(&shop_draft("Afuri", None)).await.unwrap();
        shops.create(&shop_draft("Ichiran", None)).await.unwrap();
        assert_eq!(shop_count(&pool).await, 2);

        shops.delete(afuri.id).await.unwrap();
        assert_eq!(shop_count(&pool).await, 1);

        let again = shops.delete(afuri.id).await;
        assert!(matches!(again, Err(RepositoryError::NotFound)));
        assert_eq!(shop_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rename_retokenizes_reviews(pool: PgPool) {
        let shops = ShopRepository::new(&pool);
        let shop = shops.create(&shop_draft("Afuri", None)).await.unwrap();
        ReviewRepository::new(&pool)
            .create(&review_draft(shop.id), &guest())
            .await
            .unwrap();
        assert_eq!(reviews_matching(&pool, "afuri").await, 1);

        let renamed = shops
            .update(shop.id, &shop_draft("Kaiju", None))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Kaiju");

        assert_eq!(reviews_matching(&pool, "afuri").await, 0);
        assert_eq!(reviews_matching(&pool, "kaiju").await, 1);
        assert_eq!(reviews_matching(&pool, "yuzu").await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_place_id_is_conflict(pool: PgPool) {
        let shops = ShopRepository::new(&pool);
        shops
            .create(&shop_draft("Afuri Ebisu", Some("ChIJafuri")))
            .await
            .unwrap();

        let duplicate = shops.create(&shop_draft("Afuri copy", Some("ChIJafuri"))).await;
        assert!(matches!(duplicate, Err(RepositoryError::Conflict(_))));

        let ichiran = shops
            .create(&shop_draft("Ichiran", Some("ChIJichiran")))
            .await
            .unwrap();
        let moved = shops
            .update(ichiran.id, &shop_draft("Ichiran", Some("ChIJafuri")))
            .await;
        assert!(matches!(moved, Err(RepositoryError::Conflict(_))));

        // Keeping its own place ID is not a conflict.
        shops
            .update(ichiran.id, &shop_draft("Ichiran Shibuya", Some("ChIJichiran")))
            .await
            .unwrap();

        shops.create(&shop_draft("Unlisted one", None)).await.unwrap();
        shops.create(&shop_draft("Unlisted two", None)).await.unwrap();
        assert_eq!(shop_count(&pool).await, 4);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_concurrent_creates_share_one_place_id(pool: PgPool) {
        let shops = ShopRepository::new(&pool);
        let draft = shop_draft("Afuri", Some("ChIJrace"));

        let (first, second) = tokio::join!(shops.create(&draft), shops.create(&draft));

        let created = usize::from(first.is_ok()) + usize::from(second.is_ok());
        assert_eq!(created, 1);
        let loser = first.err().or(second.err());
        assert!(matches!(loser, Some(RepositoryError::Conflict(_))));
        assert_eq!(shop_count(&pool).await, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_pages_forward_and_back(pool: PgPool) {
        let shops = ShopRepository::new(&pool);
        for name in ["One", "Two", "Three", "Four", "Five"] {
            shops.create(&shop_draft(name, None)).await.unwrap();
        }
        let filter = ShopFilter::default();

        let first = shops
            .list(&filter, &PageRequest::from_query(Some(2), None).unwrap())
            .await
            .unwrap();
        assert_eq!(names(&first), ["Five", "Four"]);
        assert!(first.prev_cursor.is_none());

        let second = shops
            .list(
                &filter,
                &PageRequest::from_query(Some(2), first.next_cursor.as_deref()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(names(&second), ["Three", "Two"]);
        assert!(second.prev_cursor.is_some());

        let last = shops
            .list(
                &filter,
                &PageRequest::from_query(Some(2), second.next_cursor.as_deref()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(names(&last), ["One"]);
        assert!(last.next_cursor.is_none());

        let back = shops
            .list(
                &filter,
                &PageRequest::from_query(Some(2), second.prev_cursor.as_deref()).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(names(&back), ["Five", "Four"]);
        assert!(back.prev_cursor.is_none());
        assert!(back.next_cursor.is_some());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_filters_by_search_tokens(pool: PgPool) {
        let shops = ShopRepository::new(&pool);
        shops.create(&shop_draft("Menya Musashi", None)).await.unwrap();
        shops.create(&shop_draft("Ichiran", None)).await.unwrap();

        let filter = ShopFilter {
            tokens: query_tokens("musashi"),
            ..ShopFilter::default()
        };
        let page = shops.list(&filter, &PageRequest::default()).await.unwrap();
        assert_eq!(names(&page), ["Menya Musashi"]);
    }
}
