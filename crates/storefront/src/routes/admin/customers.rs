//! Customer lookups.

use axum::{Json, Router, extract::State, routing::get};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::pagination::{DEFAULT_LIMIT, PageRequest, Paginated};
use hey_harvest_core::UserId;

use crate::db::addresses::AddressRepository;
use crate::db::customers::CustomerRepository;
use crate::db::orders::{OrderFilter, OrderRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{Address, CustomerSummary, OrderSummary};
use crate::routes::{ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::state::AppState;

/// Orders shown on the customer detail page.
const RECENT_ORDERS: u32 = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}", get(show))
}

#[derive(Debug, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[serde(flatten)]
    pub customer: CustomerSummary,
    pub addresses: Vec<Address>,
    pub recent_orders: Vec<OrderSummary>,
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<CustomerQuery>,
) -> Result<Json<ApiResponse<Paginated<CustomerSummary>>>> {
    let search = non_blank(query.search);
    let customers = CustomerRepository::new(state.pool())
        .list(
            search.as_deref(),
            page_request(query.page, query.limit, DEFAULT_LIMIT),
        )
        .await?;
    Ok(ApiResponse::ok(customers))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<UserId>,
) -> Result<Json<ApiResponse<CustomerDetail>>> {
    let customer = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    let addresses = AddressRepository::new(state.pool()).list(id).await?;
    let filter = OrderFilter {
        user_id: Some(id),
        ..OrderFilter::default()
    };
    let recent_orders = OrderRepository::new(state.pool())
        .list(&filter, PageRequest::new(None, Some(RECENT_ORDERS), RECENT_ORDERS))
        .await?
        .items;

    Ok(ApiResponse::ok(CustomerDetail {
        customer,
        addresses,
        recent_orders,
    }))
}
