//! Hey Harvest storefront API.
//!
//! JSON API for the makhana store: catalog, cart, checkout with Razorpay,
//! reviews, newsletter, blog and the back-office. The binary in `main.rs`
//! only wires configuration, logging and the listener around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, Request, header},
    middleware::from_fn,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::StorefrontConfig;
use crate::middleware::{
    create_session_layer, hsts_middleware, rate_limit_json_middleware, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Credentialed CORS for the SPA origin, if one is configured.
fn cors_layer(config: &StorefrontConfig) -> Option<CorsLayer> {
    let origin = config.cors_allowed_origin.as_deref()?;
    let origin = match HeaderValue::from_str(origin) {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid CORS_ALLOWED_ORIGIN");
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([HeaderName::from_static("x-request-id")]),
    )
}

/// Build the full application router with its middleware stack.
///
/// Layers run outermost first: Sentry, trace span, request id, CORS,
/// security headers, session. Rate limits sit on the route groups.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    let mut router = routes::routes()
        .layer(from_fn(rate_limit_json_middleware))
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware));

    if state.config().is_secure() {
        router = router.layer(from_fn(hsts_middleware));
    }
    if let Some(cors) = cors_layer(state.config()) {
        router = router.layer(cors);
    }

    router
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri().path(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .with_state(state)
}
