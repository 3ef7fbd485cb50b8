//! Newsletter subscription against a running storefront.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use serde_json::json;

use hey_harvest_integration_tests::{client, expect_json, unique_email, url};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_subscribe_status_unsubscribe() {
    let client = client();
    let email = unique_email("reader");

    let response = client
        .post(url("/api/newsletter/subscribe"))
        .json(&json!({ "email": email, "source": "footer" }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CREATED).await;

    let response = client
        .get(url(&format!("/api/newsletter/status?email={email}")))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["isSubscribed"], true);

    let response = client
        .post(url("/api/newsletter/unsubscribe"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::OK).await;

    let response = client
        .get(url(&format!("/api/newsletter/status?email={email}")))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["isSubscribed"], false);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_resubscribe_reuses_the_subscription() {
    let client = client();
    let email = unique_email("returning");
    let subscribe = || {
        client
            .post(url("/api/newsletter/subscribe"))
            .json(&json!({ "email": email, "firstName": "Meera" }))
            .send()
    };

    let first = expect_json(subscribe().await.unwrap(), StatusCode::CREATED).await;
    let subscription_id = first["data"]["id"].as_i64().expect("subscription id");

    let again = expect_json(subscribe().await.unwrap(), StatusCode::BAD_REQUEST).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["message"], "already subscribed");

    let response = client
        .post(url("/api/newsletter/unsubscribe"))
        .json(&json!({ "email": email, "reason": "Too many emails" }))
        .send()
        .await
        .unwrap();
    let left = expect_json(response, StatusCode::OK).await;
    assert_eq!(left["data"]["isActive"], false);
    assert!(left["data"]["unsubscribedAt"].is_string());

    let back = expect_json(subscribe().await.unwrap(), StatusCode::CREATED).await;
    assert_eq!(back["data"]["id"].as_i64(), Some(subscription_id));
    assert_eq!(back["data"]["isActive"], true);
    assert!(back["data"]["unsubscribedAt"].is_null());
    assert!(back["data"]["unsubscribeReason"].is_null());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_subscribe_rejects_bad_email() {
    let response = client()
        .post(url("/api/newsletter/subscribe"))
        .json(&json!({ "email": "not-an-email" }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::BAD_REQUEST).await;
}
