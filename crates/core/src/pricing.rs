//! Order pricing: shipping, GST, COD surcharge, coupons and totals.
//!
//! Every amount is in rupees. The total invariant is
//!
//! ```text
//! total = subtotal - discount + shipping + tax + cod
//! ```
//!
//! and tax is charged on the discounted subtotal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PaymentMethod, round_money};

/// Orders with a subtotal at or above this amount ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(500, 0, 0, false, 0);

/// Flat fee charged on every order below the free-shipping threshold.
pub const BASE_SHIPPING_FEE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Added per started weight slab.
pub const SHIPPING_FEE_PER_SLAB: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Weight slab size in grams.
pub const SHIPPING_SLAB_GRAMS: u32 = 500;

/// Default GST rate (5%).
pub const DEFAULT_GST_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Surcharge for cash-on-delivery orders.
pub const COD_CHARGE: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

/// Errors raised while pricing an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Coupon cannot be applied.
    #[error("invalid coupon: {0}")]
    InvalidCoupon(&'static str),
}

/// Shipping fee for a parcel.
///
/// Free at or above [`FREE_SHIPPING_THRESHOLD`]; otherwise the base fee plus
/// one slab fee for every started 500 g.
#[must_use]
pub fn shipping_fee(subtotal: Decimal, weight_grams: u32) -> Decimal {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        return Decimal::ZERO;
    }

    let slabs = weight_grams.div_ceil(SHIPPING_SLAB_GRAMS);
    BASE_SHIPPING_FEE + SHIPPING_FEE_PER_SLAB * Decimal::from(slabs)
}

/// GST on an amount, rounded to two decimals half-up.
#[must_use]
pub fn tax(amount: Decimal, rate: Decimal) -> Decimal {
    round_money(amount * rate)
}

/// Surcharge for the payment method.
#[must_use]
pub fn payment_surcharge(method: PaymentMethod) -> Decimal {
    match method {
        PaymentMethod::Cod => COD_CHARGE,
        PaymentMethod::Razorpay => Decimal::ZERO,
    }
}

/// How a coupon reduces the subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponKind {
    /// `value` is a percentage of the subtotal.
    Percent,
    /// `value` is a fixed rupee amount.
    Flat,
}

impl CouponKind {
    /// Stored/serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "percent",
            Self::Flat => "flat",
        }
    }
}

impl std::str::FromStr for CouponKind {
    type Err = crate::types::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percent" => Ok(Self::Percent),
            "flat" => Ok(Self::Flat),
            _ => Err(crate::types::ParseStatusError {
                kind: "coupon kind",
                value: s.to_owned(),
            }),
        }
    }
}

/// A discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_order_amount: Decimal,
    pub max_discount: Option<Decimal>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    /// Discount this coupon grants on `subtotal` at time `now`.
    ///
    /// The discount never exceeds the subtotal.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::InvalidCoupon` if the coupon is inactive,
    /// expired, or the subtotal is below its minimum order amount.
    pub fn discount_for(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<Decimal, PricingError> {
        if !self.is_active {
            return Err(PricingError::InvalidCoupon("coupon is not active"));
        }
        if self.expires_at.is_some_and(|expiry| expiry <= now) {
            return Err(PricingError::InvalidCoupon("coupon has expired"));
        }
        if subtotal < self.min_order_amount {
            return Err(PricingError::InvalidCoupon("order total below coupon minimum"));
        }

        let raw = match self.kind {
            CouponKind::Percent => round_money(subtotal * self.value / Decimal::ONE_HUNDRED),
            CouponKind::Flat => self.value,
        };
        let capped = self.max_discount.map_or(raw, |max| raw.min(max));

        Ok(capped.min(subtotal).max(Decimal::ZERO))
    }
}

/// Price breakdown of an order or a cart quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    #[serde(alias = "couponDiscount")]
    pub discount_amount: Decimal,
    pub shipping_charges: Decimal,
    pub tax_amount: Decimal,
    pub cod_charges: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    /// Compute the full breakdown.
    ///
    /// `discount` is clamped into `0..=subtotal`.
    #[must_use]
    pub fn compute(
        subtotal: Decimal,
        weight_grams: u32,
        discount: Decimal,
        method: PaymentMethod,
        gst_rate: Decimal,
    ) -> Self {
        let discount_amount = discount.max(Decimal::ZERO).min(subtotal);
        let taxable = subtotal - discount_amount;
        let shipping_charges = shipping_fee(subtotal, weight_grams);
        let tax_amount = tax(taxable, gst_rate);
        let cod_charges = payment_surcharge(method);

        Self {
            subtotal,
            discount_amount,
            shipping_charges,
            tax_amount,
            cod_charges,
            total_amount: taxable + shipping_charges + tax_amount + cod_charges,
        }
    }

    /// Whether the stored total matches its components.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total_amount
            == self.subtotal - self.discount_amount
                + self.shipping_charges
                + self.tax_amount
                + self.cod_charges
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn rupees(n: i64) -> Decimal {
        Decimal::from(n)
    }

    #[test]
    fn test_shipping_free_at_threshold() {
        for subtotal in [500, 501, 1_000, 25_000] {
            for weight in [0, 250, 5_000] {
                assert_eq!(shipping_fee(rupees(subtotal), weight), Decimal::ZERO);
            }
        }
    }

    #[test]
    fn test_shipping_below_threshold() {
        assert_eq!(shipping_fee(rupees(499), 0), rupees(50));
        assert_eq!(shipping_fee(rupees(100), 1), rupees(60));
        assert_eq!(shipping_fee(rupees(100), 500), rupees(60));
        assert_eq!(shipping_fee(rupees(100), 501), rupees(70));
        assert_eq!(shipping_fee(Decimal::new(49_999, 2), 1_200), rupees(80));
    }

    #[test]
    fn test_tax_rounding() {
        assert_eq!(tax(rupees(1_000), DEFAULT_GST_RATE), Decimal::new(5_000, 2));
        assert_eq!(tax(rupees(999), DEFAULT_GST_RATE), Decimal::new(4_995, 2));
        // 0.05 * 10.09 = 0.5045 -> 0.50, 0.05 * 10.10 = 0.505 -> 0.51
        assert_eq!(tax(Decimal::new(1_009, 2), DEFAULT_GST_RATE), Decimal::new(50, 2));
        assert_eq!(tax(Decimal::new(1_010, 2), DEFAULT_GST_RATE), Decimal::new(51, 2));
    }

    #[test]
    fn test_totals_prepaid() {
        let totals = OrderTotals::compute(
            rupees(400),
            300,
            rupees(40),
            PaymentMethod::Razorpay,
            DEFAULT_GST_RATE,
        );
        assert_eq!(totals.shipping_charges, rupees(60));
        assert_eq!(totals.tax_amount, rupees(18));
        assert_eq!(totals.cod_charges, Decimal::ZERO);
        assert_eq!(totals.total_amount, rupees(438));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_totals_cod_surcharge() {
        let totals =
            OrderTotals::compute(rupees(600), 900, Decimal::ZERO, PaymentMethod::Cod, DEFAULT_GST_RATE);
        assert_eq!(totals.shipping_charges, Decimal::ZERO);
        assert_eq!(totals.tax_amount, rupees(30));
        assert_eq!(totals.cod_charges, COD_CHARGE);
        assert_eq!(totals.total_amount, rupees(670));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_totals_clamp_discount_to_subtotal() {
        let totals = OrderTotals::compute(
            rupees(100),
            0,
            rupees(150),
            PaymentMethod::Razorpay,
            DEFAULT_GST_RATE,
        );
        assert_eq!(totals.discount_amount, rupees(100));
        assert_eq!(totals.tax_amount, Decimal::ZERO);
        assert_eq!(totals.total_amount, rupees(50));
    }

    fn coupon(kind: CouponKind, value: i64) -> Coupon {
        Coupon {
            code: "HARVEST10".to_string(),
            kind,
            value: rupees(value),
            min_order_amount: rupees(300),
            max_discount: Some(rupees(100)),
            is_active: true,
            expires_at: None,
        }
    }

    #[test]
    fn test_percent_coupon_capped() {
        let now = Utc::now();
        let c = coupon(CouponKind::Percent, 10);
        assert_eq!(c.discount_for(rupees(450), now).unwrap(), rupees(45));
        assert_eq!(c.discount_for(rupees(2_000), now).unwrap(), rupees(100));
    }

    #[test]
    fn test_flat_coupon() {
        let c = coupon(CouponKind::Flat, 75);
        assert_eq!(c.discount_for(rupees(300), Utc::now()).unwrap(), rupees(75));
    }

    #[test]
    fn test_coupon_rejections() {
        let now = Utc::now();
        let c = coupon(CouponKind::Flat, 75);
        assert!(matches!(
            c.discount_for(rupees(299), now),
            Err(PricingError::InvalidCoupon(_))
        ));

        let inactive = Coupon {
            is_active: false,
            ..coupon(CouponKind::Flat, 75)
        };
        assert!(inactive.discount_for(rupees(500), now).is_err());

        let expired = Coupon {
            expires_at: Some(now - Duration::hours(1)),
            ..coupon(CouponKind::Flat, 75)
        };
        assert!(expired.discount_for(rupees(500), now).is_err());
    }

    #[test]
    fn test_totals_accept_coupon_discount_alias() {
        let json = r#"{"subtotal":"400","couponDiscount":"40","shippingCharges":"60",
            "taxAmount":"18","codCharges":"0","totalAmount":"438"}"#;
        let totals: OrderTotals = serde_json::from_str(json).unwrap();
        assert_eq!(totals.discount_amount, rupees(40));
        assert!(totals.is_consistent());

        let out = serde_json::to_value(totals).unwrap();
        assert!(out.get("discountAmount").is_some());
        assert!(out.get("couponDiscount").is_none());
    }
}
