//! Checkout: price quotes and order placement.
//!
//! Totals are always recomputed here from current product prices. Whatever
//! the client displayed is ignored.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use hey_harvest_core::cart::{CartLine, CartSummary};
use hey_harvest_core::delivery::{DeliveryType, estimated_delivery};
use hey_harvest_core::pricing::{DEFAULT_GST_RATE, OrderTotals, PricingError};
use hey_harvest_core::validation::validate_pincode;
use hey_harvest_core::{PaymentMethod, ProductId, UserId};

use crate::db::RepositoryError;
use crate::db::cart::CartRepository;
use crate::db::coupons::CouponRepository;
use crate::db::orders::{NewOrder, NewOrderLine, OrderRepository};
use crate::db::products::ProductRepository;
use crate::models::{AddressDetails, Order, Product};

/// Largest quantity of one product in a single order.
pub const MAX_LINE_QUANTITY: u32 = 100;

/// Errors raised while quoting or placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidAddress(&'static str),

    #[error("please enter a valid 6-digit pincode")]
    InvalidPincode,

    #[error("quantity must be between 1 and {MAX_LINE_QUANTITY}")]
    InvalidQuantity,

    #[error("{0} is not available")]
    Unavailable(String),

    #[error("{0} is out of stock")]
    OutOfStock(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// One requested product and quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Inputs that change the price of a cart.
#[derive(Debug, Clone, Copy)]
pub struct QuoteOptions<'a> {
    pub pincode: Option<&'a str>,
    pub payment_method: PaymentMethod,
    pub delivery_type: DeliveryType,
    pub coupon_code: Option<&'a str>,
}

/// Price breakdown for the current cart.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub total_items: u32,
    pub total_weight_grams: u32,
    pub coupon_code: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
}

/// A checkout submission.
#[derive(Debug, Clone)]
pub struct PlaceOrder<'a> {
    /// Explicit lines; `None` checks out the saved cart.
    pub items: Option<Vec<RequestedLine>>,
    pub shipping_address: &'a AddressDetails,
    pub billing_address: Option<&'a AddressDetails>,
    pub payment_method: PaymentMethod,
    pub delivery_type: DeliveryType,
    pub coupon_code: Option<&'a str>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price the user's cart without side effects.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `InvalidPincode`, a pricing error
    /// for a rejected coupon, or a repository error. A cart line whose
    /// product was deactivated or sold out fails with `Unavailable` or
    /// `OutOfStock`, as it would at checkout.
    #[instrument(skip(self, options), fields(user_id = %user_id))]
    pub async fn quote(
        &self,
        user_id: UserId,
        options: QuoteOptions<'_>,
    ) -> Result<Quote, CheckoutError> {
        let pincode = options.pincode.map(str::trim).filter(|p| !p.is_empty());
        if pincode.is_some_and(|p| !validate_pincode(p)) {
            return Err(CheckoutError::InvalidPincode);
        }

        let entries = CartRepository::new(self.pool).items(user_id).await?;
        if entries.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let priced = price_cart(&entries)?;
        let summary = CartSummary::from_lines(priced.iter().map(|(line, _)| line));

        let coupon_code = normalize_coupon(options.coupon_code);
        let discount = self.coupon_discount(coupon_code.as_deref(), summary.total_amount).await?;

        Ok(Quote {
            totals: OrderTotals::compute(
                summary.total_amount,
                summary.total_weight_grams,
                discount,
                options.payment_method,
                DEFAULT_GST_RATE,
            ),
            total_items: summary.total_items,
            total_weight_grams: summary.total_weight_grams,
            coupon_code,
            estimated_delivery: pincode.and_then(|p| {
                estimated_delivery(Utc::now().date_naive(), p, options.delivery_type)
            }),
        })
    }

    /// Validate, price and persist an order.
    ///
    /// # Errors
    ///
    /// Returns a validation variant for bad input, `OutOfStock` when a
    /// product cannot cover the quantity, or a repository error (including
    /// `Conflict` when stock ran out between the check and the insert).
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: PlaceOrder<'_>,
    ) -> Result<Order, CheckoutError> {
        request
            .shipping_address
            .validate()
            .map_err(CheckoutError::InvalidAddress)?;
        if let Some(billing) = request.billing_address {
            billing.validate().map_err(CheckoutError::InvalidAddress)?;
        }

        let from_cart = request.items.is_none();
        let requested = match request.items {
            Some(items) => merge_lines(&items)?,
            None => CartRepository::new(self.pool)
                .items(user_id)
                .await?
                .into_iter()
                .map(|(product, quantity)| RequestedLine {
                    product_id: product.id,
                    quantity,
                })
                .collect(),
        };
        if requested.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let ids: Vec<ProductId> = requested.iter().map(|line| line.product_id).collect();
        let products = ProductRepository::new(self.pool).get_many(&ids).await?;
        let priced = price_lines(&requested, &products)?;

        let summary = CartSummary::from_lines(priced.iter().map(|(line, _)| line));
        let coupon_code = normalize_coupon(request.coupon_code);
        let discount = self.coupon_discount(coupon_code.as_deref(), summary.total_amount).await?;
        let totals = OrderTotals::compute(
            summary.total_amount,
            summary.total_weight_grams,
            discount,
            request.payment_method,
            DEFAULT_GST_RATE,
        );

        let order_lines: Vec<NewOrderLine> = priced.into_iter().map(|(_, line)| line).collect();
        let estimated = estimated_delivery(
            Utc::now().date_naive(),
            request.shipping_address.pincode.trim(),
            request.delivery_type,
        );

        let order = OrderRepository::new(self.pool)
            .create(&NewOrder {
                user_id,
                lines: &order_lines,
                totals,
                coupon_code: coupon_code.as_deref(),
                payment_method: request.payment_method,
                shipping_address: request.shipping_address,
                billing_address: request.billing_address,
                delivery_type: request.delivery_type,
                estimated_delivery: estimated,
                clear_cart: from_cart,
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.totals.total_amount,
            "Order placed"
        );

        Ok(order)
    }

    async fn coupon_discount(
        &self,
        code: Option<&str>,
        subtotal: Decimal,
    ) -> Result<Decimal, CheckoutError> {
        let Some(code) = code else {
            return Ok(Decimal::ZERO);
        };

        let coupon = CouponRepository::new(self.pool)
            .get_by_code(code)
            .await?
            .ok_or(PricingError::InvalidCoupon("unknown code"))?;

        Ok(coupon.discount_for(subtotal, Utc::now())?)
    }
}

fn normalize_coupon(code: Option<&str>) -> Option<String> {
    code.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_ascii_uppercase)
}

fn cart_line(product: &Product, quantity: u32) -> CartLine {
    CartLine {
        product_id: product.id,
        price: product.price,
        discount_price: product.discount_price,
        quantity,
        weight_grams: product.weight_grams,
    }
}

/// Price saved cart lines with the same availability rules as checkout.
fn price_cart(entries: &[(Product, u32)]) -> Result<Vec<(CartLine, NewOrderLine)>, CheckoutError> {
    let requested: Vec<RequestedLine> = entries
        .iter()
        .map(|(product, quantity)| RequestedLine {
            product_id: product.id,
            quantity: *quantity,
        })
        .collect();
    let products: Vec<Product> = entries.iter().map(|(product, _)| product.clone()).collect();
    price_lines(&requested, &products)
}

/// Merge duplicate products and check quantities.
fn merge_lines(items: &[RequestedLine]) -> Result<Vec<RequestedLine>, CheckoutError> {
    let mut merged: Vec<RequestedLine> = Vec::with_capacity(items.len());

    for item in items {
        if item.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity);
        }
        match merged.iter_mut().find(|m| m.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(*item),
        }
    }

    if merged.iter().any(|m| m.quantity > MAX_LINE_QUANTITY) {
        return Err(CheckoutError::InvalidQuantity);
    }

    Ok(merged)
}

/// Pair each requested line with its product and freeze the unit price.
fn price_lines(
    requested: &[RequestedLine],
    products: &[Product],
) -> Result<Vec<(CartLine, NewOrderLine)>, CheckoutError> {
    let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();

    requested
        .iter()
        .map(|line| {
            let product = by_id
                .get(&line.product_id)
                .filter(|p| p.is_active)
                .ok_or_else(|| CheckoutError::Unavailable(format!("product {}", line.product_id)))?;

            if !product.can_sell(line.quantity) {
                return Err(CheckoutError::OutOfStock(product.name.clone()));
            }

            let cart = cart_line(product, line.quantity);
            let order_line = NewOrderLine {
                product_id: product.id,
                product_name: product.name.clone(),
                sku: product.sku.clone(),
                quantity: line.quantity,
                unit_price: cart.unit_price(),
            };
            Ok((cart, order_line))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hey_harvest_core::{Category, Size};

    fn product(id: i32, price: i64, discount: Option<i64>, inventory: u32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(id),
            name: format!("Makhana {id}"),
            description: String::new(),
            category: Category::ALL[0],
            size: Size::ALL[0],
            price: Decimal::from(price),
            discount_price: discount.map(Decimal::from),
            effective_price: Decimal::from(discount.unwrap_or(price)),
            weight_grams: 250,
            inventory,
            sku: format!("P4S-1216-{id:04}"),
            images: vec![],
            average_rating: Decimal::ZERO,
            total_reviews: 0,
            is_active: true,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(id: i32, quantity: u32) -> RequestedLine {
        RequestedLine {
            product_id: ProductId::new(id),
            quantity,
        }
    }

    #[test]
    fn test_merge_lines_combines_duplicates() {
        let merged = merge_lines(&[line(1, 2), line(2, 1), line(1, 3)]).unwrap();
        assert_eq!(merged, vec![line(1, 5), line(2, 1)]);
    }

    #[test]
    fn test_merge_lines_rejects_zero_and_excess() {
        assert!(matches!(
            merge_lines(&[line(1, 0)]),
            Err(CheckoutError::InvalidQuantity)
        ));
        assert!(matches!(
            merge_lines(&[line(1, 60), line(1, 41)]),
            Err(CheckoutError::InvalidQuantity)
        ));
    }

    #[test]
    fn test_price_lines_uses_discount_price() {
        let products = vec![product(1, 300, Some(250), 10), product(2, 120, None, 10)];
        let priced = price_lines(&[line(1, 2), line(2, 1)], &products).unwrap();

        assert_eq!(priced.len(), 2);
        assert_eq!(priced[0].1.unit_price, Decimal::from(250));
        assert_eq!(priced[1].1.unit_price, Decimal::from(120));

        let summary = CartSummary::from_lines(priced.iter().map(|(l, _)| l));
        assert_eq!(summary.total_amount, Decimal::from(620));
        assert_eq!(summary.total_weight_grams, 750);
    }

    #[test]
    fn test_price_lines_rejects_missing_inactive_and_short_stock() {
        let mut inactive = product(2, 100, None, 10);
        inactive.is_active = false;
        let products = vec![product(1, 100, None, 1), inactive];

        assert!(matches!(
            price_lines(&[line(9, 1)], &products),
            Err(CheckoutError::Unavailable(_))
        ));
        assert!(matches!(
            price_lines(&[line(2, 1)], &products),
            Err(CheckoutError::Unavailable(_))
        ));
        let err = price_lines(&[line(1, 2)], &products).unwrap_err();
        assert_eq!(err.to_string(), "Makhana 1 is out of stock");
    }

    #[test]
    fn test_price_cart_applies_checkout_availability() {
        let mut retired = product(3, 180, None, 40);
        retired.is_active = false;

        let ok = price_cart(&[(product(1, 300, Some(250), 10), 2)]).unwrap();
        assert_eq!(ok[0].1.unit_price, Decimal::from(250));

        assert!(matches!(
            price_cart(&[(product(1, 300, None, 10), 1), (retired, 1)]),
            Err(CheckoutError::Unavailable(_))
        ));
        assert!(matches!(
            price_cart(&[(product(2, 120, None, 0), 1)]),
            Err(CheckoutError::OutOfStock(_))
        ));
    }

    #[test]
    fn test_normalize_coupon() {
        assert_eq!(normalize_coupon(Some(" harvest10 ")), Some("HARVEST10".to_string()));
        assert_eq!(normalize_coupon(Some("  ")), None);
        assert_eq!(normalize_coupon(None), None);
    }
}
