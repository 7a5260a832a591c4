//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login and registration (~10/min per IP)
//! - `places_rate_limiter`: the Google-backed proxy routes (~30/min per IP)
//! - `api_rate_limiter`: everything else under `/api` (~100/min per IP)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Client IP from proxy headers, falling back to the peer address.
///
/// Checks `X-Forwarded-For` (first hop), then `X-Real-IP`, then the
/// connection's `ConnectInfo`.
#[derive(Debug, Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        client_ip(req).ok_or(GovernorError::UnableToExtractKey)
    }
}

fn client_ip<T>(req: &Request<T>) -> Option<IpAddr> {
    let headers = req.headers();

    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

fn limiter(replenish_seconds: u64, burst: u32) -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(replenish_seconds)
        .burst_size(burst)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}

/// Auth endpoints: 1 request replenished every 6 seconds, burst of 5.
///
/// # Panics
///
/// Never panics: the period and burst are positive constants.
#[must_use]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    limiter(6, 5).expect("rate limiter config with per_second(6) and burst_size(5) is valid")
}

/// Places proxy: 1 request replenished every 2 seconds, burst of 10.
///
/// # Panics
///
/// Never panics: the period and burst are positive constants.
#[must_use]
pub fn places_rate_limiter() -> RateLimiterLayer {
    limiter(2, 10).expect("rate limiter config with per_second(2) and burst_size(10) is valid")
}

/// General API: 1 request replenished per second, burst of 50.
///
/// # Panics
///
/// Never panics: the period and burst are positive constants.
#[must_use]
pub fn api_rate_limiter() -> RateLimiterLayer {
    limiter(1, 50).expect("rate limiter config with per_second(1) and burst_size(50) is valid")
}
