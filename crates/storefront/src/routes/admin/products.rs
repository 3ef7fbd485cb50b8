//! Catalog management.
//!
//! Every write drops the product from the detail cache.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::pagination::Paginated;
use hey_harvest_core::{Category, ProductId, Size};

use crate::db::products::{PRODUCT_PAGE_SIZE, ProductInput, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::routes::products::ProductQuery;
use crate::routes::{ApiJson, ApiPath, ApiQuery, ApiResponse, page_request};
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 120;
const MAX_IMAGES: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update))
        .route("/{id}/toggle", patch(toggle_active))
        .route("/{id}/inventory", post(adjust_inventory))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub size: Size,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    pub weight_grams: u32,
    #[serde(default)]
    pub inventory: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
}

const fn default_true() -> bool {
    true
}

impl ProductRequest {
    fn into_input(self) -> Result<ProductInput> {
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(AppError::BadRequest(format!(
                "Name must be 1 to {MAX_NAME_CHARS} characters"
            )));
        }
        if self.price <= Decimal::ZERO {
            return Err(AppError::BadRequest(
                "Price must be greater than zero".to_string(),
            ));
        }
        if let Some(discount) = self.discount_price
            && (discount <= Decimal::ZERO || discount >= self.price)
        {
            return Err(AppError::BadRequest(
                "Discount price must be between zero and the price".to_string(),
            ));
        }
        if self.weight_grams == 0 {
            return Err(AppError::BadRequest(
                "Weight must be greater than zero".to_string(),
            ));
        }
        if self.images.len() > MAX_IMAGES {
            return Err(AppError::BadRequest(format!(
                "At most {MAX_IMAGES} images are allowed"
            )));
        }

        Ok(ProductInput {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            size: self.size,
            price: self.price,
            discount_price: self.discount_price,
            weight_grams: self.weight_grams,
            inventory: self.inventory,
            images: self
                .images
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            is_active: self.is_active,
            is_featured: self.is_featured,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct InventoryRequest {
    /// Units to add; negative removes.
    pub delta: i32,
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ApiResponse<Paginated<Product>>>> {
    let filter = query.filter()?;
    let page = page_request(query.page, query.limit, PRODUCT_PAGE_SIZE);
    let products = ProductRepository::new(state.pool())
        .list(&filter, query.sort, page)
        .await?;
    Ok(ApiResponse::ok(products))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    Ok(ApiResponse::ok(product))
}

/// Create a product; the SKU is generated.
#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let input = body.into_input()?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, "Product created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Product created", product),
    ))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ProductRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    let input = body.into_input()?;
    let product = ProductRepository::new(state.pool())
        .update(id, &input)
        .await?;
    state.catalog().invalidate(id).await;

    Ok(ApiResponse::with_message("Product updated", product))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn toggle_active(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductRepository::new(state.pool())
        .toggle_active(id)
        .await?;
    state.catalog().invalidate(id).await;
    tracing::info!(product_id = %id, is_active = product.is_active, "Product visibility changed");

    Ok(ApiResponse::ok(product))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn adjust_inventory(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<InventoryRequest>,
) -> Result<Json<ApiResponse<Product>>> {
    if body.delta == 0 {
        return Err(AppError::BadRequest("Delta cannot be zero".to_string()));
    }

    let product = ProductRepository::new(state.pool())
        .adjust_inventory(id, body.delta)
        .await?;
    state.catalog().invalidate(id).await;

    Ok(ApiResponse::with_message("Inventory updated", product))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> ProductRequest {
        serde_json::from_value(serde_json::json!({
            "name": " Roasted Makhana ",
            "category": "flavoured_makhana",
            "size": "16_20mm",
            "price": "249.00",
            "discountPrice": "199.00",
            "weightGrams": 100,
            "images": ["/img/a.jpg", " "]
        }))
        .unwrap()
    }

    #[test]
    fn test_into_input_trims_and_defaults() {
        let input = request().into_input().unwrap();
        assert_eq!(input.name, "Roasted Makhana");
        assert!(input.is_active);
        assert!(!input.is_featured);
        assert_eq!(input.inventory, 0);
        assert_eq!(input.images, vec!["/img/a.jpg".to_string()]);
    }

    #[test]
    fn test_into_input_rejects_bad_prices() {
        let mut bad = request();
        bad.discount_price = Some(Decimal::from(300));
        assert!(bad.into_input().is_err());

        let mut bad = request();
        bad.price = Decimal::ZERO;
        assert!(bad.into_input().is_err());
    }

    #[test]
    fn test_query_keeps_is_active() {
        let query = ProductQuery {
            is_active: Some(false),
            category: Some("pure_5_suta".to_string()),
            ..ProductQuery::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.is_active, Some(false));
        assert_eq!(filter.category, Some(Category::Pure5Suta));
    }
}
