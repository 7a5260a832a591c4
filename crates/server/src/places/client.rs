//! Google Places and Directions client.
//!
//! Text search results are cached with `moka` (5-minute TTL); station and
//! route lookups are not, since the origin changes with every shop.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use ramen_map_core::GeoPoint;

use super::error::PlacesError;
use super::types::{
    DirectionsResponse, PlaceCandidate, PlacesResponse, StationCandidate, WalkingRoute,
};
use crate::config::GoogleMapsConfig;

/// Longest accepted text search query, in characters.
pub const MAX_QUERY_LENGTH: usize = 200;

/// Place type used for the station lookup.
const TRANSIT_STATION_TYPE: &str = "transit_station";

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct SearchKey {
    query: String,
    language: String,
}

/// Client for the Google Maps web services.
#[derive(Clone)]
pub struct PlacesClient {
    inner: Arc<PlacesClientInner>,
}

struct PlacesClientInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    search_cache: Cache<SearchKey, Vec<PlaceCandidate>>,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PlacesClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &GoogleMapsConfig) -> Self {
        let search_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(PlacesClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.trim_end_matches('/').to_owned(),
                api_key: config.api_key.clone(),
                search_cache,
            }),
        }
    }

    /// GET a Maps web service endpoint and decode its JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlacesError> {
        let response = self
            .inner
            .client
            .get(format!("{}{path}", self.inner.base_url))
            .query(params)
            .query(&[("key", self.inner.api_key.expose_secret())])
            .send()
            .await
            .map_err(|e| PlacesError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PlacesError::Api {
                status: status.as_u16().to_string(),
                message: status.canonical_reason().unwrap_or("HTTP error").to_owned(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PlacesError::Response(e.to_string()))
    }

    /// Find places matching a free-text query.
    ///
    /// # Errors
    ///
    /// Returns `PlacesError::InvalidInput` for a blank or overlong query and
    /// `PlacesError::Api` if Google rejects the request.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn text_search(
        &self,
        query: &str,
        language: &str,
    ) -> Result<Vec<PlaceCandidate>, PlacesError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PlacesError::InvalidInput("query is required".to_owned()));
        }
        if query.chars().count() > MAX_QUERY_LENGTH {
            return Err(PlacesError::InvalidInput(format!(
                "query must be at most {MAX_QUERY_LENGTH} characters"
            )));
        }

        let key = SearchKey {
            query: query.to_owned(),
            language: language.to_owned(),
        };
        if let Some(cached) = self.inner.search_cache.get(&key).await {
            debug!("Cache hit for place search");
            return Ok(cached);
        }

        let response: PlacesResponse = self
            .get_json(
                "/maps/api/place/textsearch/json",
                &[("query", query), ("language", language)],
            )
            .await?;

        let candidates: Vec<PlaceCandidate> = response
            .into_results()?
            .into_iter()
            .map(PlaceCandidate::from)
            .collect();

        self.inner.search_cache.insert(key, candidates.clone()).await;
        Ok(candidates)
    }

    /// Transit stations around `origin`, nearest first.
    ///
    /// # Errors
    ///
    /// Returns `PlacesError` if the request fails or Google rejects it.
    #[instrument(skip(self))]
    pub async fn nearby_stations(
        &self,
        origin: GeoPoint,
        language: &str,
    ) -> Result<Vec<StationCandidate>, PlacesError> {
        let location = origin.to_query_value();
        let response: PlacesResponse = self
            .get_json(
                "/maps/api/place/nearbysearch/json",
                &[
                    ("location", location.as_str()),
                    ("rankby", "distance"),
                    ("type", TRANSIT_STATION_TYPE),
                    ("language", language),
                ],
            )
            .await?;

        Ok(response
            .into_results()?
            .into_iter()
            .map(StationCandidate::from)
            .collect())
    }

    /// Walking route from `origin` to a place. `None` when no route exists.
    ///
    /// # Errors
    ///
    /// Returns `PlacesError` if the request fails or Google rejects it.
    #[instrument(skip(self))]
    pub async fn walking_route(
        &self,
        origin: GeoPoint,
        place_id: &str,
        language: &str,
    ) -> Result<Option<WalkingRoute>, PlacesError> {
        let origin = origin.to_query_value();
        let destination = format!("place_id:{place_id}");
        let response: DirectionsResponse = self
            .get_json(
                "/maps/api/directions/json",
                &[
                    ("origin", origin.as_str()),
                    ("destination", destination.as_str()),
                    ("mode", "walking"),
                    ("language", language),
                ],
            )
            .await?;

        response.into_walk()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    const KEY: &str = "test-server-key";

    fn client(server: &MockServer) -> PlacesClient {
        PlacesClient::new(&GoogleMapsConfig {
            api_key: SecretString::from(KEY),
            base_url: server.base_url(),
            browser_key: None,
        })
    }

    fn shibuya() -> GeoPoint {
        GeoPoint {
            lat: 35.658,
            lng: 139.7016,
        }
    }

    #[tokio::test]
    async fn test_text_search_caches_repeated_queries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/maps/api/place/textsearch/json")
                    .query_param("key", KEY)
                    .query_param("query", "afuri ebisu")
                    .query_param("language", "ja");
                then.status(200).json_body(json!({
                    "status": "OK",
                    "results": [{
                        "place_id": "ChIJafuri",
                        "name": "AFURI Ebisu",
                        "formatted_address": "1-1-7 Ebisu, Shibuya",
                        "geometry": { "location": { "lat": 35.6467, "lng": 139.7101 } },
                        "types": ["restaurant"]
                    }]
                }));
            })
            .await;

        let places = client(&server);
        let first = places.text_search("  afuri ebisu ", "ja").await.unwrap();
        let second = places.text_search("afuri ebisu", "ja").await.unwrap();

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].place_id, "ChIJafuri");
        assert_eq!(first[0].address, "1-1-7 Ebisu, Shibuya");
        assert_eq!(first, second);
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_text_search_cache_is_per_language() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/maps/api/place/textsearch/json");
                then.status(200)
                    .json_body(json!({ "status": "ZERO_RESULTS", "results": [] }));
            })
            .await;

        let places = client(&server);
        assert!(places.text_search("ichiran", "ja").await.unwrap().is_empty());
        assert!(places.text_search("ichiran", "en").await.unwrap().is_empty());
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_invalid_query_makes_no_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/maps/api/place/textsearch/json");
                then.status(200).json_body(json!({ "status": "OK" }));
            })
            .await;

        let places = client(&server);
        let blank = places.text_search("   ", "ja").await;
        assert!(matches!(blank, Err(PlacesError::InvalidInput(_))));
        let long = "x".repeat(MAX_QUERY_LENGTH + 1);
        let overlong = places.text_search(&long, "ja").await;
        assert!(matches!(overlong, Err(PlacesError::InvalidInput(_))));
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_text_search_maps_denied_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/maps/api/place/textsearch/json");
                then.status(200).json_body(json!({
                    "status": "REQUEST_DENIED",
                    "error_message": "The provided API key is invalid."
                }));
            })
            .await;

        let err = client(&server)
            .text_search("menya", "ja")
            .await
            .unwrap_err();
        match err {
            PlacesError::Api { status, message } => {
                assert_eq!(status, "REQUEST_DENIED");
                assert_eq!(message, "The provided API key is invalid.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nearby_stations_ranks_by_distance() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/maps/api/place/nearbysearch/json")
                    .query_param("key", KEY)
                    .query_param("location", "35.658,139.7016")
                    .query_param("rankby", "distance")
                    .query_param("type", "transit_station")
                    .query_param("language", "ja");
                then.status(200).json_body(json!({
                    "status": "OK",
                    "results": [{
                        "place_id": "ChIJshibuya",
                        "name": "Shibuya",
                        "vicinity": "Shibuya",
                        "geometry": { "location": { "lat": 35.658, "lng": 139.7016 } }
                    }]
                }));
            })
            .await;

        let stations = client(&server)
            .nearby_stations(shibuya(), "ja")
            .await
            .unwrap();

        assert_eq!(stations.len(), 1);
        assert_eq!(stations[0].place_id, "ChIJshibuya");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_walking_route_targets_place_id() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/maps/api/directions/json")
                    .query_param("key", KEY)
                    .query_param("origin", "35.658,139.7016")
                    .query_param("destination", "place_id:ChIJstation")
                    .query_param("mode", "walking")
                    .query_param("language", "en");
                then.status(200).json_body(json!({
                    "status": "OK",
                    "routes": [{
                        "legs": [{
                            "duration": { "value": 420, "text": "7 mins" },
                            "distance": { "value": 550, "text": "0.6 km" }
                        }]
                    }]
                }));
            })
            .await;

        let route = client(&server)
            .walking_route(shibuya(), "ChIJstation", "en")
            .await
            .unwrap();

        assert_eq!(
            route,
            Some(WalkingRoute {
                duration_seconds: 420,
                distance_meters: 550,
            })
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_walking_route_without_route_is_none() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/maps/api/directions/json");
                then.status(200)
                    .json_body(json!({ "status": "ZERO_RESULTS", "routes": [] }));
            })
            .await;

        let route = client(&server)
            .walking_route(shibuya(), "ChIJisland", "ja")
            .await
            .unwrap();
        assert_eq!(route, None);
    }

    #[tokio::test]
    async fn test_http_error_status_is_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/maps/api/directions/json");
                then.status(403).body("forbidden");
            })
            .await;

        let err = client(&server)
            .walking_route(shibuya(), "ChIJstation", "ja")
            .await
            .unwrap_err();
        match err {
            PlacesError::Api { status, message } => {
                assert_eq!(status, "403");
                assert_eq!(message, "Forbidden");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
