//! Places proxy authentication.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use tower::ServiceExt;

use ramen_map_integration_tests::{CLIENT_IP, post_json, test_app};

#[tokio::test]
async fn test_search_without_token_is_unauthorized() {
    let resp = test_app()
        .oneshot(post_json(
            "/api/places/search",
            &serde_json::json!({"query": "ramen"}),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Missing or invalid API token");
}

#[tokio::test]
async fn test_nearest_station_rejects_non_bearer_scheme() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/places/nearest-station")
        .header("x-forwarded-for", CLIENT_IP)
        .header("content-type", "application/json")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::from(r#"{"lat": 35.0, "lng": 139.0, "country": "JP"}"#))
        .unwrap();

    let resp = test_app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_burst_is_rate_limited() {
    let app = test_app();
    let mut statuses = Vec::new();
    for _ in 0..12 {
        let resp = app
            .clone()
            .oneshot(post_json(
                "/api/places/search",
                &serde_json::json!({"query": "ramen"}),
            ))
            .await
            .unwrap();
        statuses.push(resp.status());
    }

    assert_eq!(statuses[0], StatusCode::UNAUTHORIZED);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
