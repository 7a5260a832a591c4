//! Nearest-station lookup.
//!
//! Takes the closest transit stations to a shop and keeps those within a
//! short walk. Route requests run one at a time and stop as soon as enough
//! stations are kept; the first API error ends the lookup.

use std::future::Future;

use tracing::{debug, instrument};

use ramen_map_core::GeoPoint;
use ramen_map_core::transit::{
    MAX_CANDIDATES, MAX_RESULTS, language_for_country, walking_minutes, within_walking_limit,
};

use super::client::PlacesClient;
use super::error::PlacesError;
use super::types::{NearbyStation, StationCandidate, WalkingRoute};

/// The two lookups the station pipeline needs.
pub trait TransitLookup {
    /// Transit stations around `origin`, nearest first.
    fn nearby_stations(
        &self,
        origin: GeoPoint,
        language: &str,
    ) -> impl Future<Output = Result<Vec<StationCandidate>, PlacesError>> + Send;

    /// Walking route from `origin` to a place, `None` if there is none.
    fn walking_route(
        &self,
        origin: GeoPoint,
        place_id: &str,
        language: &str,
    ) -> impl Future<Output = Result<Option<WalkingRoute>, PlacesError>> + Send;
}

impl TransitLookup for PlacesClient {
    fn nearby_stations(
        &self,
        origin: GeoPoint,
        language: &str,
    ) -> impl Future<Output = Result<Vec<StationCandidate>, PlacesError>> + Send {
        Self::nearby_stations(self, origin, language)
    }

    fn walking_route(
        &self,
        origin: GeoPoint,
        place_id: &str,
        language: &str,
    ) -> impl Future<Output = Result<Option<WalkingRoute>, PlacesError>> + Send {
        Self::walking_route(self, origin, place_id, language)
    }
}

/// Up to three stations within a twenty-minute walk of `origin`.
///
/// # Errors
///
/// Returns the first `PlacesError` from either lookup.
#[instrument(skip(lookup))]
pub async fn nearest_stations<L: TransitLookup + Sync>(
    lookup: &L,
    origin: GeoPoint,
    country: &str,
) -> Result<Vec<NearbyStation>, PlacesError> {
    origin
        .validate()
        .map_err(|e| PlacesError::InvalidInput(e.to_string()))?;
    let language = language_for_country(country);

    let candidates = lookup.nearby_stations(origin, language).await?;

    let mut stations = Vec::with_capacity(MAX_RESULTS);
    for candidate in candidates.into_iter().take(MAX_CANDIDATES) {
        let Some(route) = lookup
            .walking_route(origin, &candidate.place_id, language)
            .await?
        else {
            debug!(place_id = %candidate.place_id, "No walking route");
            continue;
        };

        if !within_walking_limit(route.duration_seconds) {
            continue;
        }

        stations.push(NearbyStation {
            place_id: candidate.place_id,
            name: candidate.name,
            location: candidate.location,
            walking_minutes: walking_minutes(route.duration_seconds),
            distance_meters: route.distance_meters,
        });
        if stations.len() == MAX_RESULTS {
            break;
        }
    }

    Ok(stations)
}
