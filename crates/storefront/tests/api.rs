//! Router-level tests that never reach the database.
//!
//! The pool is lazy and no request carries a session cookie, so only
//! paths that resolve before any query are exercised here.

#![allow(clippy::unwrap_used)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use hey_harvest_storefront::app;
use hey_harvest_storefront::config::{LogFormat, RazorpayConfig, StorefrontConfig};
use hey_harvest_storefront::db::create_lazy_pool;
use hey_harvest_storefront::state::AppState;

fn config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost:1/hey_harvest_unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: Url::parse("http://localhost:3000").unwrap(),
        session_secret: SecretString::from("k3Lq9vX2mP8wR4tZ7yB1nC6dF0gH5jS2"),
        cors_allowed_origin: Some("http://localhost:5173".to_string()),
        razorpay: RazorpayConfig {
            key_id: "rzp_test_Kx81bQ2".to_string(),
            key_secret: SecretString::from("q9Zt4LmW2vXe8RnP0sYb3HcJ"),
            api_base: Url::parse("https://api.razorpay.com/v1/").unwrap(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        log_format: LogFormat::Text,
    }
}

fn test_app() -> Router {
    let config = config();
    let pool = create_lazy_pool(&config.database_url).unwrap();
    app(AppState::new(config, pool).unwrap())
}

fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_ok() {
    let response = test_app()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let response = test_app()
        .oneshot(request("GET", "/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
    // Plain HTTP base URL: no HSTS.
    assert!(headers.get(header::STRICT_TRANSPORT_SECURITY).is_none());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let response = test_app()
        .oneshot(
            request("GET", "/health")
                .header("x-request-id", "checkout-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "checkout-42");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let response = test_app()
        .oneshot(request("GET", "/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn test_customer_routes_require_login() {
    for (method, uri) in [
        ("GET", "/api/cart"),
        ("GET", "/api/orders"),
        ("GET", "/api/auth/profile"),
        ("POST", "/api/payment/verify"),
    ] {
        let response = test_app()
            .oneshot(request(method, uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Please log in to continue");
    }
}

#[tokio::test]
async fn test_admin_routes_require_login() {
    for uri in [
        "/api/admin/products",
        "/api/admin/orders",
        "/api/admin/analytics/dashboard",
        "/api/newsletter/admin/subscribers",
    ] {
        let response = test_app()
            .oneshot(request("GET", uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_malformed_register_body_is_json_400() {
    let response = test_app()
        .oneshot(
            request("POST", "/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"email\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cors_preflight_allows_spa_origin() {
    let response = test_app()
        .oneshot(
            request("OPTIONS", "/api/products")
                .header(header::ORIGIN, "http://localhost:5173")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}

#[tokio::test]
async fn test_strict_forms_are_rate_limited_as_json() {
    let app = test_app();
    let mut last = None;
    // Burst of five, then the sixth is refused.
    for _ in 0..6 {
        let response = app
            .clone()
            .oneshot(
                request("POST", "/api/contact")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        last = Some(response);
    }

    let response = last.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}
