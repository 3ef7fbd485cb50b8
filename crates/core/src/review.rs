//! Review eligibility gate and draft validation.
//!
//! A customer may review a product once, and only after an order containing
//! that product has been delivered to them.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{OrderId, OrderStatus, ProductId, round_money};

/// Minimum title length, in characters.
pub const MIN_TITLE_CHARS: usize = 5;

/// Maximum title length, in characters.
pub const MAX_TITLE_CHARS: usize = 120;

/// Minimum comment length, in characters.
pub const MIN_COMMENT_CHARS: usize = 10;

/// Maximum comment length, in characters.
pub const MAX_COMMENT_CHARS: usize = 2_000;

/// Maximum number of images attached to a review.
pub const MAX_IMAGES: usize = 5;

/// Why a review cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("rating must be a whole number between 1 and 5")]
    InvalidRating,

    #[error("title must be between {MIN_TITLE_CHARS} and {MAX_TITLE_CHARS} characters")]
    InvalidTitle,

    #[error("comment must be between {MIN_COMMENT_CHARS} and {MAX_COMMENT_CHARS} characters")]
    InvalidComment,

    #[error("at most {MAX_IMAGES} images can be attached")]
    TooManyImages,

    #[error("you can only review products from a delivered order")]
    NoDeliveredOrder,

    #[error("you have already reviewed this product")]
    AlreadyReviewed,

    #[error("the selected order does not contain this product or is not delivered")]
    OrderNotEligible,
}

/// A star rating between 1 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    /// Validate a raw rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::InvalidRating` outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, ReviewError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (1..=5).contains(v))
            .map(Self)
            .ok_or(ReviewError::InvalidRating)
    }

    /// The rating value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// A validated review body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
}

impl ReviewDraft {
    /// Validate and trim a submitted review.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule as a `ReviewError`.
    pub fn parse(
        rating: i64,
        title: &str,
        comment: &str,
        images: Vec<String>,
    ) -> Result<Self, ReviewError> {
        let rating = Rating::new(rating)?;

        let title = title.trim();
        if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&title.chars().count()) {
            return Err(ReviewError::InvalidTitle);
        }

        let comment = comment.trim();
        if !(MIN_COMMENT_CHARS..=MAX_COMMENT_CHARS).contains(&comment.chars().count()) {
            return Err(ReviewError::InvalidComment);
        }

        if images.len() > MAX_IMAGES {
            return Err(ReviewError::TooManyImages);
        }

        Ok(Self {
            rating,
            title: title.to_owned(),
            comment: comment.to_owned(),
            images,
        })
    }
}

/// The part of a customer's order the gate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchasedOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub product_ids: Vec<ProductId>,
}

/// Result of the eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    /// The customer may review; any of these orders can be cited.
    #[serde(rename_all = "camelCase")]
    Eligible { order_ids: Vec<OrderId> },
    /// No delivered order contains the product.
    NoDeliveredOrder,
    /// A review by this customer already exists.
    AlreadyReviewed,
}

impl Eligibility {
    /// Whether a review may be submitted.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    /// Check that `order_id` is one of the qualifying orders.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReviewed`, `NoDeliveredOrder` or `OrderNotEligible`.
    pub fn authorize(&self, order_id: OrderId) -> Result<(), ReviewError> {
        match self {
            Self::AlreadyReviewed => Err(ReviewError::AlreadyReviewed),
            Self::NoDeliveredOrder => Err(ReviewError::NoDeliveredOrder),
            Self::Eligible { order_ids } if order_ids.contains(&order_id) => Ok(()),
            Self::Eligible { .. } => Err(ReviewError::OrderNotEligible),
        }
    }
}

/// Decide whether a customer may review `product_id`.
#[must_use]
pub fn check_eligibility(
    product_id: ProductId,
    orders: &[PurchasedOrder],
    already_reviewed: bool,
) -> Eligibility {
    if already_reviewed {
        return Eligibility::AlreadyReviewed;
    }

    let order_ids: Vec<OrderId> = orders
        .iter()
        .filter(|order| order.status == OrderStatus::Delivered)
        .filter(|order| order.product_ids.contains(&product_id))
        .map(|order| order.order_id)
        .collect();

    if order_ids.is_empty() {
        Eligibility::NoDeliveredOrder
    } else {
        Eligibility::Eligible { order_ids }
    }
}

/// Average rating rounded to two decimals; zero when there are no reviews.
#[must_use]
pub fn average_rating(rating_sum: i64, review_count: i64) -> Decimal {
    if review_count <= 0 {
        return Decimal::ZERO;
    }
    round_money(Decimal::from(rating_sum) / Decimal::from(review_count))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const MAKHANA: ProductId = ProductId::new(10);

    fn order(id: i32, status: OrderStatus, products: &[i32]) -> PurchasedOrder {
        PurchasedOrder {
            order_id: OrderId::new(id),
            status,
            product_ids: products.iter().copied().map(ProductId::new).collect(),
        }
    }

    #[test]
    fn test_rejected_without_delivered_order() {
        let orders = [
            order(1, OrderStatus::Shipped, &[10]),
            order(2, OrderStatus::Delivered, &[11]),
        ];
        let eligibility = check_eligibility(MAKHANA, &orders, false);
        assert_eq!(eligibility, Eligibility::NoDeliveredOrder);
        assert_eq!(
            eligibility.authorize(OrderId::new(1)),
            Err(ReviewError::NoDeliveredOrder)
        );
    }

    #[test]
    fn test_accepted_with_delivered_order() {
        let orders = [
            order(1, OrderStatus::Delivered, &[10, 11]),
            order(2, OrderStatus::Pending, &[10]),
        ];
        let eligibility = check_eligibility(MAKHANA, &orders, false);
        assert!(eligibility.is_eligible());
        assert_eq!(eligibility.authorize(OrderId::new(1)), Ok(()));
        assert_eq!(
            eligibility.authorize(OrderId::new(2)),
            Err(ReviewError::OrderNotEligible)
        );

        let draft = ReviewDraft::parse(5, "Crunchy!", "Perfectly roasted, light and fresh.", vec![]);
        assert!(draft.is_ok());
    }

    #[test]
    fn test_already_reviewed_wins() {
        let orders = [order(1, OrderStatus::Delivered, &[10])];
        let eligibility = check_eligibility(MAKHANA, &orders, true);
        assert_eq!(eligibility, Eligibility::AlreadyReviewed);
        assert_eq!(
            eligibility.authorize(OrderId::new(1)),
            Err(ReviewError::AlreadyReviewed)
        );
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert!(Rating::new(-1).is_err());
        assert_eq!(Rating::new(4).unwrap().get(), 4);
    }

    #[test]
    fn test_draft_length_rules() {
        assert_eq!(
            ReviewDraft::parse(4, "Good", "Tasty and crisp makhana", vec![]),
            Err(ReviewError::InvalidTitle)
        );
        assert_eq!(
            ReviewDraft::parse(4, "Good buy", "  too short ", vec![]),
            Err(ReviewError::InvalidComment)
        );
        let draft = ReviewDraft::parse(4, "  Good buy ", "Tasty and crisp makhana", vec![]).unwrap();
        assert_eq!(draft.title, "Good buy");
    }

    #[test]
    fn test_too_many_images() {
        let images = vec!["https://cdn.heyharvest.in/r.jpg".to_string(); 6];
        assert_eq!(
            ReviewDraft::parse(5, "Great snack", "Would buy again for sure", images),
            Err(ReviewError::TooManyImages)
        );
    }

    #[test]
    fn test_eligibility_serializes_tagged() {
        let json = serde_json::to_value(Eligibility::Eligible {
            order_ids: vec![OrderId::new(3)],
        })
        .unwrap();
        assert_eq!(json["status"], "eligible");
        assert_eq!(json["orderIds"][0], 3);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(0, 0), Decimal::ZERO);
        assert_eq!(average_rating(14, 3), Decimal::new(467, 2));
        assert_eq!(average_rating(10, 2), Decimal::from(5));
    }
}
