//! Cart line aggregation.
//!
//! The server is the source of truth for the cart; every mutation returns a
//! fresh snapshot whose totals are recomputed here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Price a customer pays per unit: the discount price when one is set,
/// otherwise the list price.
#[must_use]
pub fn effective_price(price: Decimal, discount_price: Option<Decimal>) -> Decimal {
    discount_price.unwrap_or(price)
}

/// A product line with the data needed for totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub quantity: u32,
    pub weight_grams: u32,
}

impl CartLine {
    /// Effective unit price.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        effective_price(self.price, self.discount_price)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity)
    }

    /// Parcel weight contributed by this line.
    #[must_use]
    pub const fn line_weight(&self) -> u32 {
        self.weight_grams.saturating_mul(self.quantity)
    }
}

/// Aggregate totals of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub total_items: u32,
    pub total_amount: Decimal,
    pub total_weight_grams: u32,
}

impl CartSummary {
    /// Sum quantities, amounts and weights across lines.
    #[must_use]
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a CartLine>) -> Self {
        lines.into_iter().fold(Self::default(), |acc, line| Self {
            total_items: acc.total_items.saturating_add(line.quantity),
            total_amount: acc.total_amount + line.line_total(),
            total_weight_grams: acc.total_weight_grams.saturating_add(line.line_weight()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, price: i64, discount: Option<i64>, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            price: Decimal::from(price),
            discount_price: discount.map(Decimal::from),
            quantity,
            weight_grams: 250,
        }
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        assert_eq!(
            effective_price(Decimal::from(399), Some(Decimal::from(349))),
            Decimal::from(349)
        );
        assert_eq!(effective_price(Decimal::from(399), None), Decimal::from(399));
    }

    #[test]
    fn test_totals_mix_discounted_and_list_prices() {
        let lines = [line(1, 399, Some(349), 2), line(2, 250, None, 3)];
        let summary = CartSummary::from_lines(&lines);

        assert_eq!(summary.total_items, 5);
        assert_eq!(summary.total_amount, Decimal::from(349 * 2 + 250 * 3));
        assert_eq!(summary.total_weight_grams, 1_250);
    }

    #[test]
    fn test_empty_cart() {
        let summary = CartSummary::from_lines(&Vec::<CartLine>::new());
        assert_eq!(summary, CartSummary::default());
    }
}
