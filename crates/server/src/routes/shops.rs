//! Public shop endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use ramen_map_core::pagination::{Page, PageRequest};
use ramen_map_core::search::query_tokens;
use ramen_map_core::{Bounds, ShopId};

use super::ListQuery;
use crate::db::{
    Review, ReviewFilter, ReviewRepository, ReviewSummary, Shop, ShopFilter, ShopRepository,
};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Query parameters for `GET /api/shops`.
#[derive(Debug, Default, Deserialize)]
pub struct ShopListQuery {
    pub q: Option<String>,
    /// ISO 3166-1 alpha-2; case-insensitive.
    pub country: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

impl ShopListQuery {
    fn filter(&self) -> ShopFilter {
        ShopFilter {
            tokens: self.q.as_deref().map(query_tokens).unwrap_or_default(),
            country: non_blank(self.country.as_deref()),
            tag: non_blank(self.tag.as_deref()),
        }
    }

    fn page(&self) -> Result<PageRequest> {
        Ok(PageRequest::from_query(self.limit, self.cursor.as_deref())?)
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// A shop with its review count, average score and open/closed state.
#[derive(Debug, Serialize)]
pub struct ShopDetail {
    #[serde(flatten)]
    pub shop: Shop,
    pub reviews: ReviewSummary,
    /// Omitted when hours are unknown or local time can't be derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
}

impl ShopDetail {
    fn new(shop: Shop, reviews: ReviewSummary, now: DateTime<Utc>) -> Self {
        let open_now = shop.business_hours.open_at_instant(&shop.country, now);
        Self {
            shop,
            reviews,
            open_now,
        }
    }
}

/// List or search shops.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ShopListQuery>,
) -> Result<Json<Page<Shop>>> {
    let page = query.page()?;
    let shops = ShopRepository::new(state.pool())
        .list(&query.filter(), &page)
        .await?;
    Ok(Json(shops))
}

/// Shops inside the visible map area.
#[instrument(skip(state))]
pub async fn map(
    State(state): State<AppState>,
    Query(bounds): Query<Bounds>,
) -> Result<Json<Vec<Shop>>> {
    bounds.validate()?;
    let shops = ShopRepository::new(state.pool()).in_bounds(&bounds).await?;
    Ok(Json(shops))
}

/// Shop detail.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
) -> Result<Json<ShopDetail>> {
    let shop = ShopRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {id}")))?;
    let reviews = ReviewRepository::new(state.pool())
        .summary_for_shop(id)
        .await?;
    Ok(Json(ShopDetail::new(shop, reviews, Utc::now())))
}

/// Reviews of one shop, newest first.
#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(id): Path<ShopId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Review>>> {
    let page = query.page()?;
    if ShopRepository::new(state.pool()).get(id).await?.is_none() {
        return Err(AppError::NotFound(format!("shop {id}")));
    }

    let filter = ReviewFilter {
        shop_id: Some(id),
        ..ReviewFilter::default()
    };
    let reviews = ReviewRepository::new(state.pool())
        .list(&filter, &page)
        .await?;
    Ok(Json(reviews))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use ramen_map_core::{BusinessHours, DayOfWeek, GeoPoint, Period};

    use super::*;

    fn shop(country: &str, business_hours: BusinessHours) -> Shop {
        Shop {
            id: ShopId::new(1),
            name: "Menya Kaiju".to_owned(),
            address: "1-2-3 Shinjuku, Tokyo".to_owned(),
            location: GeoPoint {
                lat: 35.69,
                lng: 139.70,
            },
            country: country.to_owned(),
            region: None,
            business_hours,
            tags: Vec::new(),
            google_place_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_detail_reports_open_now() {
        let mut hours = BusinessHours::new();
        hours.push(
            DayOfWeek::Friday,
            Period {
                open: chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                close: chrono::NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            },
        );
        // Friday 2026-10-16, 12:00 in Tokyo.
        let now = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap()
            .and_utc();

        let detail = ShopDetail::new(shop("JP", hours), ReviewSummary::default(), now);
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["open_now"], true);
        assert_eq!(json["name"], "Menya Kaiju");

        let unknown = ShopDetail::new(shop("JP", BusinessHours::new()), ReviewSummary::default(), now);
        let json = serde_json::to_value(&unknown).unwrap();
        assert!(json.get("open_now").is_none());
    }

    #[test]
    fn test_filter_drops_blank_fields() {
        let query = ShopListQuery {
            q: Some("  ".to_owned()),
            country: Some(" ".to_owned()),
            tag: Some(" Tsukemen ".to_owned()),
            ..ShopListQuery::default()
        };
        let filter = query.filter();
        assert!(filter.tokens.is_empty());
        assert_eq!(filter.country, None);
        assert_eq!(filter.tag.as_deref(), Some("Tsukemen"));
    }
}
