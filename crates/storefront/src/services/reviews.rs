//! Review eligibility and submission.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use hey_harvest_core::review::{Eligibility, ReviewDraft, ReviewError, check_eligibility};
use hey_harvest_core::{OrderId, ProductId, ReviewId, UserId};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::products::ProductRepository;
use crate::db::reviews::ReviewRepository;

#[derive(Debug, Error)]
pub enum ReviewServiceError {
    #[error("product not found")]
    ProductNotFound,

    #[error(transparent)]
    Rejected(#[from] ReviewError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A submitted review before validation.
#[derive(Debug, Clone)]
pub struct ReviewSubmission {
    pub product_id: ProductId,
    pub order_id: OrderId,
    pub rating: i64,
    pub title: String,
    pub comment: String,
    pub images: Vec<String>,
}

pub struct ReviewService<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether the user may review the product, and with which orders.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::ProductNotFound` for an unknown product.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn eligibility(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Eligibility, ReviewServiceError> {
        if ProductRepository::new(self.pool).get(product_id).await?.is_none() {
            return Err(ReviewServiceError::ProductNotFound);
        }

        let reviews = ReviewRepository::new(self.pool);
        let already_reviewed = reviews.exists_for(user_id, product_id).await?;
        let orders = OrderRepository::new(self.pool)
            .purchased_orders(user_id)
            .await?;

        Ok(check_eligibility(product_id, &orders, already_reviewed))
    }

    /// Validate and store a review, refreshing the product rating.
    ///
    /// # Errors
    ///
    /// Returns `ReviewServiceError::Rejected` when the content or the gate
    /// rejects the review.
    #[instrument(skip(self, submission), fields(user_id = %user_id, product_id = %submission.product_id))]
    pub async fn submit(
        &self,
        user_id: UserId,
        submission: ReviewSubmission,
    ) -> Result<ReviewId, ReviewServiceError> {
        let draft = ReviewDraft::parse(
            submission.rating,
            &submission.title,
            &submission.comment,
            submission.images,
        )?;

        self.eligibility(user_id, submission.product_id)
            .await?
            .authorize(submission.order_id)?;

        let review_id = ReviewRepository::new(self.pool)
            .create(user_id, submission.product_id, submission.order_id, &draft)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => {
                    ReviewServiceError::Rejected(ReviewError::AlreadyReviewed)
                }
                other => ReviewServiceError::Repository(other),
            })?;

        tracing::info!(review_id = %review_id, rating = draft.rating.get(), "Review submitted");
        Ok(review_id)
    }
}
