//! JSON API route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                               - Liveness
//! GET  /health/ready                         - Database ping
//!
//! # Auth (session cookie)
//! POST /api/auth/register|login|logout
//! GET  /api/auth/profile, PUT /api/auth/profile
//! GET  /api/auth/addresses, POST /api/auth/addresses
//! PUT  /api/auth/addresses/{id}, DELETE /api/auth/addresses/{id}
//! PUT  /api/auth/addresses/{id}/default
//!
//! # Catalog
//! GET  /api/products, /featured, /categories, /{id}
//! GET  /api/reviews/product/{productId}
//! GET  /api/blog, /api/blog/{slug}
//!
//! # Customer (requires auth)
//! GET  /api/cart, POST /add, PUT /update, DELETE /remove/{productId}, DELETE /clear, POST /quote
//! GET  /api/orders, POST /api/orders, GET /{id}, POST /{id}/cancel, GET /{id}/tracking
//! POST /api/payment/create-order, POST /api/payment/verify
//! GET  /api/reviews/eligibility/{productId}, POST /api/reviews
//!
//! # Public forms
//! POST /api/newsletter/subscribe|unsubscribe, PUT /preferences, GET /status
//! POST /api/contact
//!
//! # Back-office (requires admin)
//! /api/admin/products*, /orders*, /customers*, /analytics/dashboard, /blog*, /contact*
//! GET  /api/newsletter/admin/subscribers
//! ```

pub mod admin;
pub mod auth;
pub mod blog;
pub mod cart;
pub mod contact;
pub mod newsletter;
pub mod orders;
pub mod payment;
pub mod products;
pub mod reviews;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;

use hey_harvest_core::pagination::PageRequest;

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, strict_rate_limiter};
use crate::state::AppState;

/// JSON body extractor whose rejection is an `AppError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejection is an `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor whose rejection is an `AppError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Success envelope: `{"success": true, "message"?, "data"}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: None,
            data,
        })
    }

    pub fn with_message(message: &'static str, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: Some(message),
            data,
        })
    }
}

/// Page request from `page`/`limit` query parameters.
#[must_use]
pub fn page_request(page: Option<u32>, limit: Option<u32>, default_limit: u32) -> PageRequest {
    PageRequest::new(page, limit, default_limit)
}

/// Treat blank query values as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness probe: checks the database.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(state.pool()).await {
        Ok(_) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}

/// Form endpoints that get the strict limiter.
fn strict_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/newsletter/subscribe", post(newsletter::subscribe))
        .route("/api/contact", post(contact::submit))
        .layer(strict_rate_limiter())
}

/// Everything else under `/api`.
fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth::router())
        .nest("/api/products", products::router())
        .nest("/api/cart", cart::router())
        .nest("/api/orders", orders::router())
        .nest("/api/payment", payment::router())
        .nest("/api/reviews", reviews::router())
        .nest("/api/newsletter", newsletter::router())
        .nest("/api/blog", blog::router())
        .nest("/api/admin", admin::router())
        .layer(api_rate_limiter())
}

/// JSON 404 for unmatched paths.
async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(ready))
        .merge(strict_routes())
        .merge(api_routes())
        .fallback(not_found)
}
