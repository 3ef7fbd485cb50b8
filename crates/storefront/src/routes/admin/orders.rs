//! Order management: filtered list, detail, status changes and CSV export.

use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, put},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};
use hey_harvest_core::{OrderId, OrderStatus, PaymentStatus};

use crate::db::orders::{OrderFilter, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Order, OrderSummary};
use crate::routes::{ApiJson, ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/export", get(export))
        .route("/{id}", get(show))
        .route("/{id}/status", put(update_status))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl OrderQuery {
    fn filter(&self) -> Result<OrderFilter> {
        let status = non_blank(self.status.clone())
            .map(|s| s.parse::<OrderStatus>())
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let payment_status = non_blank(self.payment_status.clone())
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(AppError::BadRequest(
                "'from' must not be after 'to'".to_string(),
            ));
        }

        Ok(OrderFilter {
            status,
            payment_status,
            search: non_blank(self.search.clone()),
            from: self.from,
            to: self.to,
            user_id: None,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// One CSV line of the export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    order_number: &'a str,
    created_at: String,
    customer_name: &'a str,
    customer_email: &'a str,
    items: u32,
    total_amount: Decimal,
    payment_method: &'static str,
    payment_status: &'static str,
    order_status: &'static str,
    tracking_number: &'a str,
}

impl<'a> From<&'a OrderSummary> for ExportRow<'a> {
    fn from(order: &'a OrderSummary) -> Self {
        Self {
            order_number: &order.order_number,
            created_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            customer_name: &order.customer_name,
            customer_email: &order.customer_email,
            items: order.item_count,
            total_amount: order.total_amount,
            payment_method: order.payment_method.as_str(),
            payment_status: order.payment_status.as_str(),
            order_status: order.order_status.as_str(),
            tracking_number: order.tracking_number.as_deref().unwrap_or(""),
        }
    }
}

fn to_csv(orders: &[OrderSummary]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for order in orders {
        writer
            .serialize(ExportRow::from(order))
            .map_err(|e| AppError::Internal(format!("csv write failed: {e}")))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {e}")))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Json<ApiResponse<Paginated<OrderSummary>>>> {
    let filter = query.filter()?;
    let orders = OrderRepository::new(state.pool())
        .list(&filter, page_request(query.page, query.limit, DEFAULT_LIMIT))
        .await?;
    Ok(ApiResponse::ok(orders))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = OrderRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(ApiResponse::ok(order))
}

/// Move an order along its lifecycle.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<ApiResponse<Order>>> {
    let next = body
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let note = non_blank(body.note);

    let order = OrderRepository::new(state.pool())
        .transition(id, next, note.as_deref(), None)
        .await?;

    if next == OrderStatus::Cancelled {
        for item in &order.items {
            state.catalog().invalidate(item.product_id).await;
        }
    }

    Ok(ApiResponse::with_message("Order status updated", order))
}

/// The filtered list as a CSV download.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn export(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<impl IntoResponse> {
    let filter = query.filter()?;
    let orders = OrderRepository::new(state.pool()).export(&filter).await?;
    let body = to_csv(&orders)?;
    tracing::info!(rows = orders.len(), "Orders exported");

    let filename = format!("orders-{}.csv", Utc::now().format("%Y%m%d"));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use hey_harvest_core::{PaymentMethod, UserId};

    use super::*;

    fn summary() -> OrderSummary {
        OrderSummary {
            id: OrderId::new(7),
            order_number: "HH-20260101-0007".to_string(),
            user_id: UserId::new(3),
            customer_email: "asha@example.com".to_string(),
            customer_name: "Asha, Verma".to_string(),
            item_count: 2,
            total_amount: Decimal::new(64_800, 2),
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Confirmed,
            tracking_number: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_csv_has_header_and_quotes_commas() {
        let csv = String::from_utf8(to_csv(&[summary()]).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "order_number,created_at,customer_name,customer_email,items,total_amount,payment_method,payment_status,order_status,tracking_number"
        );
        assert_eq!(
            lines.next().unwrap(),
            "HH-20260101-0007,2026-01-01 10:30,\"Asha, Verma\",asha@example.com,2,648.00,cod,pending,confirmed,"
        );
    }

    #[test]
    fn test_filter_parses_statuses_case_insensitively() {
        let query = OrderQuery {
            status: Some("SHIPPED".to_string()),
            payment_status: Some("paid".to_string()),
            ..OrderQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.status, Some(OrderStatus::Shipped));
        assert_eq!(filter.payment_status, Some(PaymentStatus::Paid));

        let bad = OrderQuery {
            status: Some("lost".to_string()),
            ..OrderQuery::default()
        };
        assert!(bad.filter().is_err());
    }
}
