//! Customer order handlers: checkout, history, cancellation and tracking.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::delivery::DeliveryType;
use hey_harvest_core::lifecycle::OrderProgress;
use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};
use hey_harvest_core::{OrderId, OrderStatus, PaymentMethod, ProductId, UserId};

use super::{ApiJson, ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::db::orders::{OrderFilter, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{AddressDetails, Order, OrderSummary};
use crate::services::checkout::{CheckoutService, PlaceOrder, RequestedLine};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show))
        .route("/{id}/cancel", post(cancel))
        .route("/{id}/tracking", get(tracking))
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    /// Explicit lines; when absent the saved cart is checked out.
    #[serde(default)]
    pub items: Option<Vec<OrderLineRequest>>,
    pub shipping_address: AddressDetails,
    #[serde(default)]
    pub billing_address: Option<AddressDetails>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CancelRequest {
    /// The body is optional; an empty one means no reason.
    fn parse(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub order_number: String,
    pub order_status: OrderStatus,
    pub progress: OrderProgress,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

async fn own_order(state: &AppState, id: OrderId, user_id: UserId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get_for_user(id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))
}

/// The caller's orders, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<ApiResponse<Paginated<OrderSummary>>>> {
    let filter = OrderFilter {
        user_id: Some(user.id),
        ..OrderFilter::default()
    };
    let orders = OrderRepository::new(state.pool())
        .list(&filter, page_request(query.page, query.limit, DEFAULT_LIMIT))
        .await?;
    Ok(ApiResponse::ok(orders))
}

/// Place an order from explicit lines or the saved cart.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    let items = body.items.map(|lines| {
        lines
            .into_iter()
            .map(|line| RequestedLine {
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .collect()
    });
    let coupon_code = non_blank(body.coupon_code);

    let order = CheckoutService::new(state.pool())
        .place_order(
            user.id,
            PlaceOrder {
                items,
                shipping_address: &body.shipping_address,
                billing_address: body.billing_address.as_ref(),
                payment_method: body.payment_method,
                delivery_type: body.delivery_type,
                coupon_code: coupon_code.as_deref(),
            },
        )
        .await?;

    for item in &order.items {
        state.catalog().invalidate(item.product_id).await;
    }
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "Order placed");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Order placed", order),
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<ApiResponse<Order>>> {
    Ok(ApiResponse::ok(own_order(&state, id, user.id).await?))
}

/// Cancel an own order that has not been processed yet.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
    body: Bytes,
) -> Result<Json<ApiResponse<Order>>> {
    let request = CancelRequest::parse(&body)?;
    let order = own_order(&state, id, user.id).await?;
    if !order.order_status.is_customer_cancellable() {
        return Err(AppError::BadRequest(
            "This order can no longer be cancelled".to_string(),
        ));
    }

    let reason = non_blank(request.reason);
    let note = reason.map_or_else(
        || "Cancelled by customer".to_string(),
        |r| format!("Cancelled by customer: {r}"),
    );

    let order = OrderRepository::new(state.pool())
        .transition(id, OrderStatus::Cancelled, Some(&note), Some(user.id))
        .await?;

    for item in &order.items {
        state.catalog().invalidate(item.product_id).await;
    }

    Ok(ApiResponse::with_message("Order cancelled", order))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn tracking(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<ApiResponse<Tracking>>> {
    let order = own_order(&state, id, user.id).await?;
    Ok(ApiResponse::ok(Tracking {
        progress: order.progress(),
        order_number: order.order_number,
        order_status: order.order_status,
        tracking_number: order.tracking_number,
        estimated_delivery: order.estimated_delivery,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_defaults() {
        let body: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "shippingAddress": {
                "fullName": "Asha Verma",
                "phone": "9876543210",
                "line1": "12 MG Road",
                "city": "Patna",
                "state": "Bihar",
                "pincode": "800001"
            },
            "paymentMethod": "cod"
        }))
        .unwrap();

        assert!(body.items.is_none());
        assert!(body.billing_address.is_none());
        assert_eq!(body.payment_method, PaymentMethod::Cod);
        assert_eq!(body.delivery_type, DeliveryType::Standard);
    }

    #[test]
    fn test_create_request_accepts_online_alias() {
        let body: CreateOrderRequest = serde_json::from_value(serde_json::json!({
            "items": [{"productId": 4, "quantity": 2}],
            "shippingAddress": {
                "fullName": "Asha Verma",
                "phone": "9876543210",
                "line1": "12 MG Road",
                "city": "Patna",
                "state": "Bihar",
                "pincode": "800001"
            },
            "paymentMethod": "online",
            "deliveryType": "express"
        }))
        .unwrap();

        assert_eq!(body.payment_method, PaymentMethod::Razorpay);
        assert_eq!(body.items.unwrap()[0].quantity, 2);
    }

    #[test]
    fn test_cancel_body_is_optional() {
        assert!(CancelRequest::parse(b"").unwrap().reason.is_none());
        let parsed = CancelRequest::parse(br#"{"reason": "ordered twice"}"#).unwrap();
        assert_eq!(parsed.reason.as_deref(), Some("ordered twice"));
        assert!(CancelRequest::parse(b"{not json").is_err());
    }
}
