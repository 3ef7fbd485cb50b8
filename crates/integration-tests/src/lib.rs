//! End-to-end helpers for the Hey Harvest API.
//!
//! The tests in `tests/` talk to a running storefront over HTTP and are
//! `#[ignore]`d by default.
//!
//! ```bash
//! hh-cli migrate && hh-cli seed catalog
//! cargo run -p hey-harvest-storefront &
//! cargo test -p hey-harvest-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` overrides the default `http://localhost:3000`.
//! Tests that need an admin or talk to repositories directly also read
//! `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`).

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use secrecy::SecretString;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use rust_decimal::Decimal;

use hey_harvest_core::{Category, Email, Size, UserRole};
use hey_harvest_storefront::db::products::ProductInput;
use hey_harvest_storefront::db::{self, ProductRepository, UserRepository};
use hey_harvest_storefront::models::Product;

/// Password used for every throwaway account.
pub const TEST_PASSWORD: &str = "makhana-crunch-2024";

/// Base URL of the storefront under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Absolute URL for an API path.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url().trim_end_matches('/'))
}

/// A client that keeps the session cookie between requests.
///
/// Each client presents its own `x-forwarded-for` address, so the per-IP
/// limiters treat every simulated shopper separately.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn client() -> Client {
    let octets = Uuid::new_v4().into_bytes();
    let forwarded = format!("198.18.{}.{}", octets[0], octets[1]);
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&forwarded).expect("valid header value"),
    );

    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Pool on the storefront database.
///
/// # Panics
///
/// Panics if no database URL is set or the connection fails.
pub async fn pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL or DATABASE_URL must be set");
    db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database")
}

/// A unique address so reruns never collide.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Read a JSON envelope and check its status.
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    body
}

/// Register a fresh customer; the returned client is logged in.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn logged_in_customer() -> (Client, String) {
    let client = client();
    let email = unique_email("customer");
    let response = client
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "name": "Test Customer",
            "phone": "9876543210",
        }))
        .send()
        .await
        .expect("Failed to register");
    expect_json(response, StatusCode::CREATED).await;
    (client, email)
}

/// Log `client` in as `email`.
///
/// # Panics
///
/// Panics if the login is rejected.
pub async fn login(client: &Client, email: &str) {
    let response = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("Failed to log in");
    expect_json(response, StatusCode::OK).await;
}

/// Register a fresh account, promote it, and log in again so the session
/// carries the admin role.
///
/// # Panics
///
/// Panics if any step fails.
pub async fn logged_in_admin() -> Client {
    let (client, email) = logged_in_customer().await;

    let pool = pool().await;
    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&Email::parse(&email).expect("valid email"))
        .await
        .expect("user lookup")
        .expect("registered user exists");
    users
        .set_role(user.id, UserRole::Admin)
        .await
        .expect("promote to admin");

    login(&client, &email).await;
    client
}

/// Insert an active product no other test touches.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn fresh_product(pool: &PgPool, inventory: u32) -> Product {
    ProductRepository::new(pool)
        .create(&ProductInput {
            name: format!("Test Makhana {}", Uuid::new_v4().simple()),
            description: "Roasted fox nuts for end-to-end tests".to_string(),
            category: Category::Pure5Suta,
            size: Size::Mm16To20,
            price: Decimal::new(44_900, 2),
            discount_price: None,
            weight_grams: 250,
            inventory,
            images: Vec::new(),
            is_active: true,
            is_featured: false,
        })
        .await
        .expect("Failed to insert product")
}

/// A shipping address that passes validation.
#[must_use]
pub fn shipping_address() -> Value {
    json!({
        "fullName": "Test Customer",
        "phone": "9876543210",
        "line1": "12 Lake Road",
        "city": "Darbhanga",
        "state": "Bihar",
        "pincode": "846004",
    })
}
