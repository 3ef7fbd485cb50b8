//! Account lifecycle against a running storefront.
//!
//! Run with: `cargo test -p hey-harvest-integration-tests -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use hey_harvest_integration_tests::{
    TEST_PASSWORD, client, expect_json, logged_in_customer, unique_email, url,
};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_register_profile_logout_login() {
    let (client, email) = logged_in_customer().await;

    let response = client.get(url("/api/auth/profile")).send().await.unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["email"], email.to_lowercase());
    assert_eq!(body["data"]["role"], "customer");

    let response = client.post(url("/api/auth/logout")).send().await.unwrap();
    expect_json(response, StatusCode::OK).await;

    let response = client.get(url("/api/auth/profile")).send().await.unwrap();
    expect_json(response, StatusCode::UNAUTHORIZED).await;

    let response = client
        .post(url("/api/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::OK).await;

    let response = client.get(url("/api/auth/profile")).send().await.unwrap();
    expect_json(response, StatusCode::OK).await;
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_duplicate_registration_conflicts() {
    let (_client, email) = logged_in_customer().await;

    let response = client()
        .post(url("/api/auth/register"))
        .json(&json!({
            "email": email,
            "password": TEST_PASSWORD,
            "name": "Someone Else",
        }))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::CONFLICT).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wrong_password_is_unauthorized() {
    let response = client()
        .post(url("/api/auth/login"))
        .json(&json!({
            "email": unique_email("nobody"),
            "password": "definitely-wrong",
        }))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(body["success"], false);
}
