//! Cart snapshot types.

use rust_decimal::Decimal;
use serde::Serialize;

use hey_harvest_core::cart::{CartLine, CartSummary};

use super::{Product, ProductSummary};

/// One line of the cart with its product embedded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: ProductSummary,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// The full cart as returned by every cart endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total_items: u32,
    pub total_amount: Decimal,
    #[serde(skip)]
    pub total_weight_grams: u32,
}

impl Cart {
    /// Build the snapshot from stored `(product, quantity)` pairs.
    #[must_use]
    pub fn from_entries(entries: &[(Product, u32)]) -> Self {
        let lines: Vec<CartLine> = entries
            .iter()
            .map(|(product, quantity)| CartLine {
                product_id: product.id,
                price: product.price,
                discount_price: product.discount_price,
                quantity: *quantity,
                weight_grams: product.weight_grams,
            })
            .collect();
        let summary = CartSummary::from_lines(&lines);

        let items = entries
            .iter()
            .zip(&lines)
            .map(|((product, quantity), line)| CartItem {
                product: product.summary(),
                quantity: *quantity,
                line_total: line.line_total(),
            })
            .collect();

        Self {
            items,
            total_items: summary.total_items,
            total_amount: summary.total_amount,
            total_weight_grams: summary.total_weight_grams,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use hey_harvest_core::{Category, ProductId, Size};

    use super::*;

    fn product(id: i32, price: i64, discount: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Makhana {id}"),
            description: String::new(),
            category: Category::Pure5Suta,
            size: Size::Mm16To20,
            price: Decimal::from(price),
            discount_price: discount.map(Decimal::from),
            effective_price: Decimal::from(discount.unwrap_or(price)),
            weight_grams: 200,
            inventory: 50,
            sku: format!("P5S-1620-{id:04}"),
            images: vec!["https://cdn.heyharvest.in/p.jpg".to_string()],
            average_rating: Decimal::ZERO,
            total_reviews: 0,
            is_active: true,
            is_featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_totals() {
        let cart = Cart::from_entries(&[(product(1, 399, Some(349)), 2), (product(2, 250, None), 1)]);

        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.total_amount, Decimal::from(948));
        assert_eq!(cart.total_weight_grams, 600);
        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.items[0].line_total, Decimal::from(698));
    }

    #[test]
    fn test_empty_snapshot_serializes() {
        let cart = Cart::from_entries(&[]);
        assert!(cart.is_empty());

        let json = serde_json::to_value(&cart).unwrap_or_default();
        assert_eq!(json["totalItems"], 0);
        assert!(json.get("totalWeightGrams").is_none());
    }
}
