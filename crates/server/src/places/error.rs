//! Google Maps web service errors.

use thiserror::Error;

/// Errors that can occur when calling Places or Directions.
#[derive(Debug, Error)]
pub enum PlacesError {
    /// HTTP request failed.
    #[error("Google Maps request failed: {0}")]
    Request(String),

    /// Failed to parse response.
    #[error("Google Maps response error: {0}")]
    Response(String),

    /// The API answered with a non-OK status.
    #[error("Google Maps API error {status}: {message}")]
    Api { status: String, message: String },

    /// Caller input rejected before any request was made.
    #[error("invalid places request: {0}")]
    InvalidInput(String),
}

impl PlacesError {
    /// Build an `Api` error from a response status and optional message.
    pub(crate) fn api(status: &str, message: Option<String>) -> Self {
        Self::Api {
            status: status.to_owned(),
            message: message.unwrap_or_else(|| "no error message".to_owned()),
        }
    }
}
