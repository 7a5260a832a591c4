//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::places::PlacesClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    places: PlacesClient,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let places = PlacesClient::new(&config.google);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                places,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the Google Maps client.
    #[must_use]
    pub fn places(&self) -> &PlacesClient {
        &self.inner.places
    }
}
