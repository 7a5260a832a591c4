//! Wire types for the Google Maps web services and the shapes returned to
//! our own clients.

use serde::{Deserialize, Serialize};

use ramen_map_core::GeoPoint;

use super::error::PlacesError;

/// Response status meaning success.
pub const STATUS_OK: &str = "OK";
/// Response status meaning a valid request with nothing found.
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";
/// Directions status for an origin or destination that could not be geocoded.
pub const STATUS_NOT_FOUND: &str = "NOT_FOUND";

// =============================================================================
// Google responses
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// One result of a text or nearby search.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: String,
    /// Present on text search results.
    #[serde(default)]
    pub formatted_address: Option<String>,
    /// Present on nearby search results.
    #[serde(default)]
    pub vicinity: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub types: Vec<String>,
}

/// Text search and nearby search share this envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PlacesResponse {
    /// Results of a successful response; `ZERO_RESULTS` is an empty list.
    ///
    /// # Errors
    ///
    /// Returns `PlacesError::Api` for any other status.
    pub fn into_results(self) -> Result<Vec<PlaceResult>, PlacesError> {
        match self.status.as_str() {
            STATUS_OK => Ok(self.results),
            STATUS_ZERO_RESULTS => Ok(Vec::new()),
            other => Err(PlacesError::api(other, self.error_message)),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TextValue {
    /// Seconds for durations, meters for distances.
    pub value: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Leg {
    pub duration: TextValue,
    pub distance: TextValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub legs: Vec<Leg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DirectionsResponse {
    /// The first leg of the first route, if any.
    ///
    /// # Errors
    ///
    /// Returns `PlacesError::Api` for statuses other than OK, `ZERO_RESULTS`
    /// and `NOT_FOUND`.
    pub fn into_walk(self) -> Result<Option<WalkingRoute>, PlacesError> {
        match self.status.as_str() {
            STATUS_OK => Ok(self
                .routes
                .into_iter()
                .next()
                .and_then(|route| route.legs.into_iter().next())
                .map(|leg| WalkingRoute {
                    duration_seconds: leg.duration.value,
                    distance_meters: leg.distance.value,
                })),
            STATUS_ZERO_RESULTS | STATUS_NOT_FOUND => Ok(None),
            other => Err(PlacesError::api(other, self.error_message)),
        }
    }
}

// =============================================================================
// Our shapes
// =============================================================================

/// A place returned by the search proxy, ready to prefill a shop form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub location: GeoPoint,
}

impl From<PlaceResult> for PlaceCandidate {
    fn from(result: PlaceResult) -> Self {
        Self {
            place_id: result.place_id,
            name: result.name,
            address: result
                .formatted_address
                .or(result.vicinity)
                .unwrap_or_default(),
            location: GeoPoint {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
            },
        }
    }
}

/// A transit station near a point, before any route is known.
#[derive(Debug, Clone, PartialEq)]
pub struct StationCandidate {
    pub place_id: String,
    pub name: String,
    pub location: GeoPoint,
}

impl From<PlaceResult> for StationCandidate {
    fn from(result: PlaceResult) -> Self {
        Self {
            place_id: result.place_id,
            name: result.name,
            location: GeoPoint {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
            },
        }
    }
}

/// A walking route between two points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkingRoute {
    pub duration_seconds: u32,
    pub distance_meters: u32,
}

/// A station kept by the nearest-station lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStation {
    pub place_id: String,
    pub name: String,
    pub location: GeoPoint,
    pub walking_minutes: u32,
    pub distance_meters: u32,
}
