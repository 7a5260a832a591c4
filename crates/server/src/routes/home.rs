//! Map page.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use ramen_map_core::pagination::PageRequest;

use crate::db::{Review, ReviewFilter, ReviewRepository, StatsRepository};
use crate::error::Result;
use crate::middleware::OptionalUser;
use crate::models::CurrentUser;
use crate::state::AppState;

/// Reviews shown under the map.
const RECENT_REVIEWS: u32 = 10;

/// A review as shown in the "recent" list.
pub struct ReviewCard {
    pub shop_id: String,
    pub shop_name: String,
    pub author: String,
    pub visit_date: String,
    pub overall: Option<String>,
}

impl From<&Review> for ReviewCard {
    fn from(review: &Review) -> Self {
        Self {
            shop_id: review.shop_id.to_string(),
            shop_name: review.shop_name.clone(),
            author: review.author.display_name.clone(),
            visit_date: review.visit_date.format("%Y-%m-%d").to_string(),
            overall: review.scores.overall.map(|s| format!("{s:.1}")),
        }
    }
}

/// Map page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub user: Option<CurrentUser>,
    pub shop_count: i64,
    pub recent_reviews: Vec<ReviewCard>,
    /// Google Maps JavaScript API key; without it the page shows a list only.
    pub maps_browser_key: Option<String>,
}

/// Display the map page.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
) -> Result<HomeTemplate> {
    let stats = StatsRepository::new(state.pool()).get().await?;

    let page = PageRequest {
        limit: RECENT_REVIEWS,
        cursor: None,
    };
    let recent = ReviewRepository::new(state.pool())
        .list(&ReviewFilter::default(), &page)
        .await?;

    Ok(HomeTemplate {
        user,
        shop_count: stats.shops,
        recent_reviews: recent.items.iter().map(ReviewCard::from).collect(),
        maps_browser_key: state.config().google.browser_key.clone(),
    })
}
