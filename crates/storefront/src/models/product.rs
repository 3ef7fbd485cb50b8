//! Catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use hey_harvest_core::cart::effective_price;
use hey_harvest_core::{Category, ProductId, Size};

/// A catalog product.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub size: Size,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub effective_price: Decimal,
    pub weight_grams: u32,
    pub inventory: u32,
    pub sku: String,
    pub images: Vec<String>,
    pub average_rating: Decimal,
    pub total_reviews: u32,
    pub is_active: bool,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can be sold right now.
    #[must_use]
    pub const fn can_sell(&self, quantity: u32) -> bool {
        self.is_active && quantity > 0 && quantity <= self.inventory
    }

    /// Short form embedded in carts and listings.
    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            name: self.name.clone(),
            sku: self.sku.clone(),
            image: self.images.first().cloned(),
            price: self.price,
            discount_price: self.discount_price,
            effective_price: effective_price(self.price, self.discount_price),
            inventory: self.inventory,
            is_active: self.is_active,
        }
    }
}

/// Product fields embedded in cart lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub effective_price: Decimal,
    pub inventory: u32,
    pub is_active: bool,
}

/// A category with the number of active products in it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: Category,
    pub label: &'static str,
    pub count: u64,
}
