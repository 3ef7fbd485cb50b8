//! Review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hey_harvest_core::review::Rating;
use hey_harvest_core::{OrderId, ProductId, ReviewId, UserId};

/// A published product review.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub order_id: OrderId,
    pub rating: Rating,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
}
