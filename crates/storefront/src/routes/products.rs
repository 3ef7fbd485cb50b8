//! Public catalog handlers.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::pagination::Paginated;
use hey_harvest_core::{Category, ProductId, Size};

use super::{ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::db::products::{PRODUCT_PAGE_SIZE, ProductFilter, ProductRepository, ProductSort};
use crate::error::{AppError, Result};
use crate::models::{CategoryCount, Product};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/featured", get(featured))
        .route("/categories", get(categories))
        .route("/{id}", get(show))
}

/// Catalog query parameters, shared with the back-office list.
///
/// `isActive` is only honoured by the back-office; the public list always
/// shows active products.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    #[serde(default)]
    pub sort: ProductSort,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    /// Build a repository filter, rejecting unknown category or size values.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for an unknown category or size, or an
    /// inverted price range.
    pub fn filter(&self) -> Result<ProductFilter> {
        let category = non_blank(self.category.clone())
            .map(|c| c.parse::<Category>())
            .transpose()
            .map_err(|_| AppError::BadRequest("Unknown category".to_string()))?;
        let size = non_blank(self.size.clone())
            .map(|s| s.parse::<Size>())
            .transpose()
            .map_err(|_| AppError::BadRequest("Unknown size".to_string()))?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price)
            && min > max
        {
            return Err(AppError::BadRequest(
                "minPrice cannot exceed maxPrice".to_string(),
            ));
        }

        Ok(ProductFilter {
            category,
            size,
            min_price: self.min_price,
            max_price: self.max_price,
            search: non_blank(self.search.clone()),
            featured: self.featured,
            in_stock: self.in_stock,
            is_active: self.is_active,
        })
    }
}

/// Active products, filtered, sorted and paginated.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ApiResponse<Paginated<Product>>>> {
    let filter = ProductFilter {
        is_active: Some(true),
        ..query.filter()?
    };
    let page = page_request(query.page, query.limit, PRODUCT_PAGE_SIZE);

    let products = ProductRepository::new(state.pool())
        .list(&filter, query.sort, page)
        .await?;
    Ok(ApiResponse::ok(products))
}

#[instrument(skip(state))]
pub async fn featured(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let products = ProductRepository::new(state.pool()).featured().await?;
    Ok(ApiResponse::ok(products))
}

#[instrument(skip(state))]
pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryCount>>>> {
    let categories = ProductRepository::new(state.pool()).categories().await?;
    Ok(ApiResponse::ok(categories))
}

/// Product detail; inactive products are hidden.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Arc<Product>>>> {
    let product = state
        .catalog()
        .product(state.pool(), id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(ApiResponse::ok(product))
}
