//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use hey_harvest_core::pagination::{PageRequest, Paginated};
use hey_harvest_core::review::{Rating, ReviewDraft, average_rating};
use hey_harvest_core::{OrderId, ProductId, ReviewId, UserId};

use super::{RepositoryError, count, is_unique_violation_on};
use crate::models::Review;

#[derive(Debug, FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    user_name: String,
    order_id: OrderId,
    rating: i16,
    title: String,
    comment: String,
    images: Vec<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = RepositoryError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let rating = Rating::new(i64::from(row.rating))
            .map_err(|_| RepositoryError::DataCorruption(format!("invalid rating: {}", row.rating)))?;

        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            user_name: row.user_name,
            order_id: row.order_id,
            rating,
            title: row.title,
            comment: row.comment,
            images: row.images,
            created_at: row.created_at,
        })
    }
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Page through a product's reviews, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_product(
        &self,
        product_id: ProductId,
        page: PageRequest,
    ) -> Result<Paginated<Review>, RepositoryError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.review WHERE product_id = $1")
                .bind(product_id)
                .fetch_one(self.pool)
                .await?;

        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.product_id, r.user_id, u.name AS user_name, r.order_id, r.rating,
                   r.title, r.comment, r.images, r.created_at
            FROM storefront.review r
            JOIN storefront.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            ",
        )
        .bind(product_id)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(Review::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated::new(items, page, count(total)))
    }

    /// Whether the user already reviewed the product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM storefront.review WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(exists)
    }

    /// Insert a review and refresh the product's rating aggregate.
    ///
    /// The product row stays locked until commit, so concurrent reviews of
    /// one product recompute the aggregate one after another.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the user already reviewed the product.
    pub async fn create(
        &self,
        user_id: UserId,
        product_id: ProductId,
        order_id: OrderId,
        draft: &ReviewDraft,
    ) -> Result<ReviewId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(ProductId,)> =
            sqlx::query_as("SELECT id FROM storefront.product WHERE id = $1 FOR UPDATE")
                .bind(product_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let (review_id,): (ReviewId,) = sqlx::query_as(
            r"
            INSERT INTO storefront.review
                (product_id, user_id, order_id, rating, title, comment, images)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(order_id)
        .bind(i16::from(draft.rating.get()))
        .bind(&draft.title)
        .bind(&draft.comment)
        .bind(&draft.images)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation_on(&e, "review_user_id_product_id_key") {
                RepositoryError::Conflict("you have already reviewed this product".to_owned())
            } else {
                RepositoryError::Database(e)
            }
        })?;

        let (sum, total): (i64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(rating), 0)::INT8, COUNT(*)
            FROM storefront.review
            WHERE product_id = $1
            ",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE storefront.product
            SET average_rating = $2, total_reviews = $3, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .bind(average_rating(sum, total))
        .bind(i32::try_from(total).unwrap_or(i32::MAX))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review_id)
    }
}
