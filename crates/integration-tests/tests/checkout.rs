//! Browse, cart, quote, place, cancel, fulfil and review orders.
//!
//! Needs the seeded catalog (`hh-cli seed catalog`) and database access
//! for the scenarios that insert their own products.

#![allow(clippy::unwrap_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use hey_harvest_integration_tests::{
    client, expect_json, fresh_product, logged_in_admin, logged_in_customer, pool,
    shipping_address, url,
};

async fn inventory_of(product_id: i32) -> i64 {
    let response = client()
        .get(url(&format!("/api/products/{product_id}")))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    body["data"]["inventory"].as_i64().expect("inventory")
}

async fn first_in_stock_product() -> Value {
    let response = client()
        .get(url("/api/products?inStock=true&limit=1"))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    body["data"]["items"][0].clone()
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_catalog_is_public() {
    let response = client().get(url("/api/products")).send().await.unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["pagination"]["total"].is_number());

    let response = client()
        .get(url("/api/products/categories"))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::OK).await;

    let response = client()
        .get(url("/api/products/999999999"))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cod_order_round_trip() {
    let pool = pool().await;
    let product = fresh_product(&pool, 20).await;
    let product_id = product.id.as_i32();
    let (client, _email) = logged_in_customer().await;

    let response = client
        .post(url("/api/cart/add"))
        .json(&json!({ "productId": product_id, "quantity": 2 }))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["totalItems"], 2);

    let response = client
        .post(url("/api/cart/quote"))
        .json(&json!({ "pincode": "846004", "paymentMethod": "cod" }))
        .send()
        .await
        .unwrap();
    let quote = expect_json(response, StatusCode::OK).await;
    assert!(quote["data"]["totalAmount"].is_string());

    let response = client
        .post(url("/api/orders"))
        .json(&json!({
            "shippingAddress": shipping_address(),
            "paymentMethod": "cod",
        }))
        .send()
        .await
        .unwrap();
    let order = expect_json(response, StatusCode::CREATED).await;
    let order_id = order["data"]["id"].as_i64().expect("order id");
    assert_eq!(order["data"]["paymentMethod"], "cod");
    assert_eq!(inventory_of(product_id).await, 18);

    // Checkout empties the cart.
    let response = client.get(url("/api/cart")).send().await.unwrap();
    let cart = expect_json(response, StatusCode::OK).await;
    assert_eq!(cart["data"]["totalItems"], 0);

    let response = client
        .get(url(&format!("/api/orders/{order_id}/tracking")))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::OK).await;

    let response = client
        .post(url(&format!("/api/orders/{order_id}/cancel")))
        .json(&json!({ "reason": "Ordered by mistake" }))
        .send()
        .await
        .unwrap();
    let cancelled = expect_json(response, StatusCode::OK).await;
    assert_eq!(cancelled["data"]["orderStatus"], "cancelled");
    assert_eq!(inventory_of(product_id).await, 20);

    // A second cancel is refused and restores nothing.
    let response = client
        .post(url(&format!("/api/orders/{order_id}/cancel")))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(inventory_of(product_id).await, 20);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_quote_refuses_sold_out_cart_lines() {
    let pool = pool().await;
    let product = fresh_product(&pool, 1).await;
    let (shopper, _) = logged_in_customer().await;
    let (rival, _) = logged_in_customer().await;

    for client in [&shopper, &rival] {
        let response = client
            .post(url("/api/cart/add"))
            .json(&json!({ "productId": product.id.as_i32(), "quantity": 1 }))
            .send()
            .await
            .unwrap();
        expect_json(response, StatusCode::OK).await;
    }

    let response = rival
        .post(url("/api/orders"))
        .json(&json!({ "shippingAddress": shipping_address(), "paymentMethod": "cod" }))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CREATED).await;

    let response = shopper
        .post(url("/api/cart/quote"))
        .json(&json!({ "paymentMethod": "cod" }))
        .send()
        .await
        .unwrap();
    let quote = expect_json(response, StatusCode::CONFLICT).await;
    assert!(quote["message"].as_str().unwrap().contains("out of stock"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_fulfilment_and_review_gate() {
    let pool = pool().await;
    let product = fresh_product(&pool, 10).await;
    let product_id = product.id.as_i32();
    let admin = logged_in_admin().await;
    let (customer, _) = logged_in_customer().await;

    let response = customer
        .post(url("/api/orders"))
        .json(&json!({
            "items": [{ "productId": product_id, "quantity": 1 }],
            "shippingAddress": shipping_address(),
            "paymentMethod": "cod",
        }))
        .send()
        .await
        .unwrap();
    let order = expect_json(response, StatusCode::CREATED).await;
    let order_id = order["data"]["id"].as_i64().expect("order id");

    let review = json!({
        "productId": product_id,
        "orderId": order_id,
        "rating": 5,
        "title": "Proper crunch",
        "comment": "Light, crisp and not oily at all. Will reorder.",
    });
    let response = customer
        .post(url("/api/reviews"))
        .json(&review)
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::BAD_REQUEST).await;

    let set_status = |status: &'static str| {
        admin
            .put(url(&format!("/api/admin/orders/{order_id}/status")))
            .json(&json!({ "status": status }))
            .send()
    };

    // Pending cannot jump straight to delivered.
    let skipped = expect_json(set_status("delivered").await.unwrap(), StatusCode::CONFLICT).await;
    assert_eq!(skipped["success"], false);

    for status in ["confirmed", "processing", "shipped", "delivered"] {
        let body = expect_json(set_status(status).await.unwrap(), StatusCode::OK).await;
        assert_eq!(body["data"]["orderStatus"], status);
    }
    let response = customer
        .get(url(&format!("/api/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    let delivered = expect_json(response, StatusCode::OK).await;
    assert!(delivered["data"]["trackingNumber"].is_string());
    assert_eq!(delivered["data"]["paymentStatus"], "paid");

    // Delivered orders cannot be cancelled.
    expect_json(set_status("cancelled").await.unwrap(), StatusCode::CONFLICT).await;

    let response = customer
        .post(url("/api/reviews"))
        .json(&review)
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CREATED).await;

    let response = customer
        .post(url("/api/reviews"))
        .json(&review)
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::CONFLICT).await;

    let response = client()
        .get(url(&format!("/api/products/{product_id}")))
        .send()
        .await
        .unwrap();
    let body = expect_json(response, StatusCode::OK).await;
    assert_eq!(body["data"]["totalReviews"], 1);
    let average: Decimal = body["data"]["averageRating"].as_str().unwrap().parse().unwrap();
    assert_eq!(average, Decimal::from(5));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_orders_are_private() {
    let (owner, _) = logged_in_customer().await;
    let product = first_in_stock_product().await;

    let response = owner
        .post(url("/api/orders"))
        .json(&json!({
            "items": [{ "productId": product["id"], "quantity": 1 }],
            "shippingAddress": shipping_address(),
            "paymentMethod": "cod",
        }))
        .send()
        .await
        .unwrap();
    let order = expect_json(response, StatusCode::CREATED).await;
    let order_id = order["data"]["id"].as_i64().expect("order id");

    let (stranger, _) = logged_in_customer().await;
    let response = stranger
        .get(url(&format!("/api/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    expect_json(response, StatusCode::NOT_FOUND).await;
}
