//! Google Maps proxy for shop registration.
//!
//! Requires a Bearer token so the server key is never spent on anonymous
//! traffic.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use ramen_map_core::GeoPoint;

use crate::error::Result;
use crate::middleware::RequireBearer;
use crate::places::{NearbyStation, PlaceCandidate, nearest_stations};
use crate::state::AppState;

/// Language used when a search request does not name one.
const DEFAULT_LANGUAGE: &str = "ja";

/// `POST /api/places/search` body.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl SearchRequest {
    fn language(&self) -> &str {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// `POST /api/places/nearest-station` body.
#[derive(Debug, Deserialize)]
pub struct NearestStationRequest {
    pub lat: f64,
    pub lng: f64,
    /// ISO country of the shop; picks the response language.
    pub country: String,
}

/// Free-text place search.
#[instrument(skip(state, req), fields(%user_id))]
pub async fn search(
    State(state): State<AppState>,
    RequireBearer(user_id): RequireBearer,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<PlaceCandidate>>> {
    let results = state
        .places()
        .text_search(&req.query, req.language())
        .await?;
    Ok(Json(results))
}

/// Up to three stations within walking distance of a point.
#[instrument(skip(state, req), fields(%user_id))]
pub async fn nearest_station(
    State(state): State<AppState>,
    RequireBearer(user_id): RequireBearer,
    Json(req): Json<NearestStationRequest>,
) -> Result<Json<Vec<NearbyStation>>> {
    let origin = GeoPoint {
        lat: req.lat,
        lng: req.lng,
    };
    let stations = nearest_stations(state.places(), origin, &req.country).await?;
    Ok(Json(stations))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_search_language_defaults_to_japanese() {
        let req: SearchRequest = serde_json::from_str(r#"{"query": "ramen"}"#).unwrap();
        assert_eq!(req.language(), "ja");

        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "ramen", "language": " "}"#).unwrap();
        assert_eq!(req.language(), "ja");

        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "ramen", "language": "en"}"#).unwrap();
        assert_eq!(req.language(), "en");
    }
}
