//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting (governor, per route group)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    OptionalUser, RequireAdmin, RequireBearer, RequireUser, clear_current_user, set_current_user,
};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter, places_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
