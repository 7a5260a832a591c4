//! `x-request-id` propagation.
//!
//! An ID from an upstream proxy is kept when it looks sane; otherwise a
//! UUID v4 is minted. The ID is stored in the request extensions as
//! [`RequestId`], tagged on the trace span and the Sentry scope, and echoed
//! on the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

/// The HTTP header name for request IDs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LENGTH: usize = 128;

/// The current request's ID, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Returns true if an upstream ID may be reused as-is.
fn is_acceptable(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// Attach a request ID to the request, the logs and the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| is_acceptable(id))
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    Span::current().record("request_id", id.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &id));

    let header = HeaderValue::from_str(&id).ok();
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_filter() {
        assert!(is_acceptable("edge-1234"));
        assert!(is_acceptable("3f2b1c9e-7a1d-4c55-9d2e-0f6b8a1e2c3d"));
        assert!(!is_acceptable(""));
        assert!(!is_acceptable("has space"));
        assert!(!is_acceptable("line\nbreak"));
        assert!(!is_acceptable(&"a".repeat(MAX_REQUEST_ID_LENGTH + 1)));
    }
}
