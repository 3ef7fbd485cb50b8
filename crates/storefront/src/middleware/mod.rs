//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with `request_id` field)
//! 3. Request ID
//! 4. CORS (only when `CORS_ALLOWED_ORIGIN` is set)
//! 5. Security headers
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//! 7. Rate limiting (governor), per route group; 429s rewritten to JSON

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{api_rate_limiter, rate_limit_json_middleware, strict_rate_limiter};
pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::{hsts_middleware, security_headers_middleware};
pub use session::create_session_layer;
