//! Server-side cart handlers.
//!
//! Every mutation answers with the full recomputed cart.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get, post, put},
};
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::delivery::DeliveryType;
use hey_harvest_core::{PaymentMethod, ProductId, UserId};

use super::{ApiJson, ApiPath, ApiResponse};
use crate::db::cart::CartRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Cart, Product};
use crate::services::checkout::{CheckoutService, MAX_LINE_QUANTITY, Quote, QuoteOptions};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show))
        .route("/add", post(add))
        .route("/update", put(update))
        .route("/remove/{product_id}", delete(remove))
        .route("/clear", delete(clear))
        .route("/quote", post(quote))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: u32,
}

const fn one() -> u32 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub pincode: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    pub coupon_code: Option<String>,
}

async fn snapshot(state: &AppState, user_id: UserId) -> Result<Cart> {
    let entries = CartRepository::new(state.pool()).items(user_id).await?;
    Ok(Cart::from_entries(&entries))
}

/// Load a product and check it can cover `quantity` units.
async fn sellable(state: &AppState, product_id: ProductId, quantity: u32) -> Result<Product> {
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    check_stock(&product, quantity)?;
    Ok(product)
}

fn check_stock(product: &Product, quantity: u32) -> Result<()> {
    if !product.is_active {
        return Err(AppError::BadRequest(format!(
            "{} is not available",
            product.name
        )));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "Quantity must be between 1 and {MAX_LINE_QUANTITY}"
        )));
    }
    if !product.can_sell(quantity) {
        return Err(AppError::BadRequest(format!(
            "Only {} units of {} available",
            product.inventory, product.name
        )));
    }
    Ok(())
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Cart>>> {
    Ok(ApiResponse::ok(snapshot(&state, user.id).await?))
}

/// Add units; an existing line is incremented.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Json<ApiResponse<Cart>>> {
    if body.quantity == 0 {
        return Err(AppError::BadRequest(
            "Quantity must be at least 1".to_string(),
        ));
    }

    let repo = CartRepository::new(state.pool());
    let existing = repo.quantity_of(user.id, body.product_id).await?;
    sellable(&state, body.product_id, existing.saturating_add(body.quantity)).await?;

    repo.add(user.id, body.product_id, body.quantity).await?;
    Ok(ApiResponse::with_message(
        "Added to cart",
        snapshot(&state, user.id).await?,
    ))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<CartLineRequest>,
) -> Result<Json<ApiResponse<Cart>>> {
    let repo = CartRepository::new(state.pool());

    if body.quantity == 0 {
        repo.remove(user.id, body.product_id).await?;
    } else {
        sellable(&state, body.product_id, body.quantity).await?;
        repo.set_quantity(user.id, body.product_id, body.quantity)
            .await?;
    }

    Ok(ApiResponse::with_message(
        "Cart updated",
        snapshot(&state, user.id).await?,
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Json<ApiResponse<Cart>>> {
    if !CartRepository::new(state.pool())
        .remove(user.id, product_id)
        .await?
    {
        return Err(AppError::NotFound("Item not in cart".to_string()));
    }

    Ok(ApiResponse::with_message(
        "Removed from cart",
        snapshot(&state, user.id).await?,
    ))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Cart>>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(ApiResponse::with_message(
        "Cart cleared",
        Cart::from_entries(&[]),
    ))
}

/// Price breakdown for the current cart. Nothing is written.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn quote(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<QuoteRequest>,
) -> Result<Json<ApiResponse<Quote>>> {
    let quote = CheckoutService::new(state.pool())
        .quote(
            user.id,
            QuoteOptions {
                pincode: body.pincode.as_deref(),
                payment_method: body.payment_method,
                delivery_type: body.delivery_type,
                coupon_code: body.coupon_code.as_deref(),
            },
        )
        .await?;
    Ok(ApiResponse::ok(quote))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use hey_harvest_core::{Category, Size};

    use super::*;

    fn product(inventory: u32, is_active: bool) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Pure 4 Suta".to_string(),
            description: String::new(),
            category: Category::Pure4Suta,
            size: Size::Mm12To16,
            price: Decimal::from(299),
            discount_price: None,
            effective_price: Decimal::from(299),
            weight_grams: 100,
            inventory,
            sku: "P4S-1216-0001".to_string(),
            images: vec![],
            average_rating: Decimal::ZERO,
            total_reviews: 0,
            is_active,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_check_stock() {
        assert!(check_stock(&product(5, true), 5).is_ok());
        assert!(check_stock(&product(5, true), 6).is_err());
        assert!(check_stock(&product(5, false), 1).is_err());
        assert!(check_stock(&product(500, true), MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_line_request_defaults_to_one() {
        let body: CartLineRequest = serde_json::from_str(r#"{"productId": 3}"#).unwrap();
        assert_eq!(body.quantity, 1);
    }
}
