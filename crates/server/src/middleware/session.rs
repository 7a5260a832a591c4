//! Cookie sessions stored in `PostgreSQL`.
//!
//! The `public.session` table comes from the server migrations. Sessions
//! last two weeks past the last request and use `SameSite=Lax` so a link
//! from a map app lands signed in.

use sqlx::PgPool;
use tower_sessions::cookie::{SameSite, time::Duration};
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::ServerConfig;

pub const SESSION_COOKIE_NAME: &str = "ramen_session";

const IDLE_TIMEOUT: Duration = Duration::days(14);

/// Build the session layer.
///
/// # Panics
///
/// Panics only if the fixed schema or table name is rejected by the store.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &ServerConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone())
        .with_schema_name("public")
        .and_then(|store| store.with_table_name("session"))
        .expect("static session table name");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(IDLE_TIMEOUT))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
