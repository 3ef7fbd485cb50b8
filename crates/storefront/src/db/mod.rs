//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user`, `user_password` - Accounts and argon2 hashes
//! - `address` - Saved shipping addresses
//! - `product` - Catalog (`sku_serial` sequence feeds SKU suffixes)
//! - `cart_item` - Server-side cart per user
//! - `coupon` - Discount codes
//! - `order`, `order_item`, `order_status_history` - Orders (`order_number_serial`)
//! - `review` - Product reviews, one per user and product
//! - `newsletter_subscription` - Newsletter signups
//! - `blog_post`, `contact_message` - Content and support inbox
//!
//! Sessions live in `tower_sessions.session`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p hey-harvest-cli -- migrate
//! ```

pub mod addresses;
pub mod analytics;
pub mod blog;
pub mod cart;
pub mod contact;
pub mod coupons;
pub mod customers;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use analytics::AnalyticsRepository;
pub use blog::BlogRepository;
pub use cart::CartRepository;
pub use contact::ContactRepository;
pub use coupons::CouponRepository;
pub use customers::CustomerRepository;
pub use newsletter::NewsletterRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use reviews::ReviewRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map a unique violation to `Conflict(message)`, anything else to `Database`.
    pub(crate) fn unique_violation(err: sqlx::Error, message: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(message.to_owned());
        }
        Self::Database(err)
    }
}

/// Whether `err` is a unique violation on the named constraint.
pub(crate) fn is_unique_violation_on(err: &sqlx::Error, constraint: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err)
            if db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
    )
}

/// Parse a stored text column into a domain enum.
pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid {column}: {e}")))
}

/// Convert a stored non-negative integer to `u32`.
pub(crate) fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}

/// Convert a row count to `u64`.
pub(crate) fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options().connect(database_url.expose_secret()).await
}

/// Create a pool that connects on first use and keeps no idle connections.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL cannot be parsed.
pub fn create_lazy_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    pool_options()
        .min_connections(0)
        .connect_lazy(database_url.expose_secret())
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hey_harvest_core::{Category, OrderStatus};

    use super::*;

    #[test]
    fn test_parse_column() {
        let status: OrderStatus = parse_column("shipped", "order_status").unwrap_or_default();
        assert_eq!(status, OrderStatus::Shipped);

        let err = parse_column::<Category>("lotus", "category").unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(msg) if msg.contains("category")));
    }

    #[test]
    fn test_non_negative() {
        assert!(matches!(non_negative(3, "inventory"), Ok(3)));
        assert!(non_negative(-1, "inventory").is_err());
        assert_eq!(count(-5), 0);
    }
}
