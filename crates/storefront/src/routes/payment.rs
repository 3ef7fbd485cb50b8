//! Prepaid checkout handlers.
//!
//! `create-order` opens a Razorpay order for a pending order of the caller.
//! `verify` checks the signature the checkout widget hands back.

use axum::{Json, Router, extract::State, routing::post};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::{OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price};

use super::{ApiJson, ApiResponse};
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::Order;
use crate::services::payment::{CURRENCY, PaymentError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-order", post(create_order))
        .route("/verify", post(verify))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

/// What the checkout widget needs to open.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub key_id: String,
    pub gateway_order_id: String,
    /// Amount in paise.
    pub amount: i64,
    pub currency: String,
    pub order_number: String,
}

/// Widget callback fields. The widget's own snake-case names are accepted.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(alias = "razorpay_order_id")]
    pub gateway_order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    pub gateway_payment_id: String,
    #[serde(alias = "razorpay_signature")]
    pub signature: String,
}

/// Why an order cannot take an online payment, if it cannot.
fn payment_blocker(
    method: PaymentMethod,
    payment: PaymentStatus,
    status: OrderStatus,
) -> Option<&'static str> {
    if method != PaymentMethod::Razorpay {
        Some("This order is not an online payment order")
    } else if payment == PaymentStatus::Paid {
        Some("This order has already been paid")
    } else if status != OrderStatus::Pending {
        Some("This order is no longer awaiting payment")
    } else {
        None
    }
}

fn ensure_payable(order: &Order) -> Result<()> {
    payment_blocker(order.payment_method, order.payment_status, order.order_status)
        .map_or(Ok(()), |reason| Err(AppError::BadRequest(reason.to_string())))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn create_order(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CreatePaymentRequest>,
) -> Result<Json<ApiResponse<CheckoutSession>>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .get_for_user(body.order_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    ensure_payable(&order)?;

    let amount = Price::inr(order.totals.total_amount)
        .minor_units()
        .ok_or(PaymentError::InvalidAmount)?;
    let gateway_order = state
        .razorpay()
        .create_order(amount, &order.order_number)
        .await?;

    repo.set_gateway_order(order.id, &gateway_order.id).await?;
    add_breadcrumb(
        "payment",
        "Gateway order created",
        Some(&[
            ("order_number", order.order_number.as_str()),
            ("gateway_order_id", gateway_order.id.as_str()),
        ]),
    );
    tracing::info!(
        order_id = %order.id,
        gateway_order_id = %gateway_order.id,
        "Gateway order created"
    );

    Ok(ApiResponse::ok(CheckoutSession {
        key_id: state.razorpay().key_id().to_string(),
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        currency: if gateway_order.currency.is_empty() {
            CURRENCY.to_string()
        } else {
            gateway_order.currency
        },
        order_number: order.order_number,
    }))
}

/// Verify the widget signature and record the payment.
#[instrument(skip(state, user, body), fields(user_id = %user.id, gateway_order_id = %body.gateway_order_id))]
pub async fn verify(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let repo = OrderRepository::new(state.pool());
    let order = repo
        .find_by_gateway_order(user.id, &body.gateway_order_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.payment_status == PaymentStatus::Paid {
        return Ok(ApiResponse::with_message("Payment already verified", order));
    }
    if let Err(err) = ensure_payable(&order) {
        tracing::warn!(
            order_id = %order.id,
            order_status = %order.order_status,
            gateway_payment_id = %body.gateway_payment_id,
            "Payment callback for an order not awaiting payment, refund may be needed"
        );
        return Err(err);
    }

    add_breadcrumb(
        "payment",
        "Verifying payment signature",
        Some(&[("order_number", order.order_number.as_str())]),
    );
    let valid = state.razorpay().verify_signature(
        &body.gateway_order_id,
        &body.gateway_payment_id,
        &body.signature,
    );
    if !valid {
        repo.mark_payment_failed(order.id).await?;
        tracing::warn!(order_id = %order.id, "Payment signature mismatch");
        return Err(AppError::BadRequest(
            "Payment verification failed".to_string(),
        ));
    }

    let order = repo.mark_paid(order.id, &body.gateway_payment_id).await?;
    tracing::info!(order_id = %order.id, "Payment verified");

    Ok(ApiResponse::with_message("Payment verified", order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_only_pending_online_orders_take_payment() {
        use PaymentMethod::{Cod, Razorpay};

        assert_eq!(
            payment_blocker(Razorpay, PaymentStatus::Pending, OrderStatus::Pending),
            None
        );
        assert_eq!(
            payment_blocker(Razorpay, PaymentStatus::Pending, OrderStatus::Cancelled),
            Some("This order is no longer awaiting payment")
        );
        assert_eq!(
            payment_blocker(Razorpay, PaymentStatus::Failed, OrderStatus::Confirmed),
            Some("This order is no longer awaiting payment")
        );
        assert!(payment_blocker(Razorpay, PaymentStatus::Paid, OrderStatus::Pending).is_some());
        assert!(payment_blocker(Cod, PaymentStatus::Pending, OrderStatus::Pending).is_some());
    }

    #[test]
    fn test_verify_request_accepts_widget_names() {
        let body: VerifyRequest = serde_json::from_value(serde_json::json!({
            "razorpay_order_id": "order_9A33XWu170gUtm",
            "razorpay_payment_id": "pay_29QQoUBi66xm2f",
            "razorpay_signature": "abc123"
        }))
        .unwrap();
        assert_eq!(body.gateway_order_id, "order_9A33XWu170gUtm");
        assert_eq!(body.gateway_payment_id, "pay_29QQoUBi66xm2f");

        let body: VerifyRequest = serde_json::from_value(serde_json::json!({
            "gatewayOrderId": "order_1",
            "gatewayPaymentId": "pay_1",
            "signature": "s"
        }))
        .unwrap();
        assert_eq!(body.gateway_order_id, "order_1");
    }
}
