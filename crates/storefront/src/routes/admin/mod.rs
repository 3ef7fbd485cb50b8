//! Back-office JSON handlers. Every handler takes [`RequireAdmin`].
//!
//! [`RequireAdmin`]: crate::middleware::RequireAdmin

pub mod analytics;
pub mod blog;
pub mod contact;
pub mod customers;
pub mod orders;
pub mod products;

use axum::Router;

use crate::state::AppState;

/// Routes mounted under `/api/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/customers", customers::router())
        .nest("/analytics", analytics::router())
        .nest("/blog", blog::router())
        .nest("/contact", contact::router())
}
