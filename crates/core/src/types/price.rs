//! Type-safe price representation using decimal arithmetic.
//!
//! All monetary values in the store are Indian rupees held as [`Decimal`]
//! with two fractional digits. Payment gateways take amounts in the minor
//! unit (paise), see [`Price::minor_units`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round a monetary amount to two decimals, half away from zero.
///
/// This is the "round-half-up on the scaled value" rule used for GST and
/// percentage coupons: `49.945` becomes `49.95`.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (rupees, not paise).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a rupee price.
    #[must_use]
    pub const fn inr(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::INR)
    }

    /// Amount in the minor currency unit (paise for INR).
    ///
    /// Returns `None` if the amount does not fit in an `i64` after scaling.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        use rust_decimal::prelude::ToPrimitive;

        (round_money(self.amount) * Decimal::ONE_HUNDRED).to_i64()
    }

    /// Format for display (e.g., "₹499.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), round_money(self.amount))
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    INR,
    USD,
}

impl CurrencyCode {
    /// Currency symbol used in receipts and exports.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::INR => "₹",
            Self::USD => "$",
        }
    }

    /// ISO code string.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::INR => "INR",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(Decimal::new(49_945, 3)), Decimal::new(4995, 2));
        assert_eq!(round_money(Decimal::new(49_944, 3)), Decimal::new(4994, 2));
        assert_eq!(round_money(Decimal::new(50, 0)), Decimal::new(5000, 2));
    }

    #[test]
    fn test_minor_units() {
        let price = Price::inr(Decimal::new(52_499, 2));
        assert_eq!(price.minor_units(), Some(52_499));
    }

    #[test]
    fn test_display() {
        let price = Price::inr(Decimal::new(499, 0));
        assert_eq!(price.display(), "₹499.00");
    }
}
