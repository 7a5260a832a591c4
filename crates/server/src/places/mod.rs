//! Google Maps web services: place search and the nearest-station lookup.

mod client;
mod error;
pub mod stations;
pub mod types;

pub use client::{MAX_QUERY_LENGTH, PlacesClient};
pub use error::PlacesError;
pub use stations::{TransitLookup, nearest_stations};
pub use types::{NearbyStation, PlaceCandidate};
