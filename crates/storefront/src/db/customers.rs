//! Back-office customer queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use hey_harvest_core::UserId;
use hey_harvest_core::pagination::{PageRequest, Paginated};

use super::products::escape_like;
use super::{RepositoryError, count};
use crate::models::CustomerSummary;

#[derive(Debug, FromRow)]
struct CustomerRow {
    id: UserId,
    email: String,
    name: String,
    phone: Option<String>,
    order_count: i64,
    lifetime_spend: Decimal,
    last_order_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for CustomerSummary {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            order_count: count(row.order_count),
            lifetime_spend: row.lifetime_spend,
            last_order_at: row.last_order_at,
            created_at: row.created_at,
        }
    }
}

const CUSTOMER_SELECT: &str = r"
    SELECT u.id, u.email, u.name, u.phone,
           COUNT(o.id) AS order_count,
           COALESCE(SUM(o.total_amount) FILTER (WHERE o.payment_status = 'paid'), 0)
               AS lifetime_spend,
           MAX(o.created_at) AS last_order_at,
           u.created_at
    FROM storefront.user u
    LEFT JOIN storefront.order o ON o.user_id = u.id
    WHERE u.role = 'customer'";

pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Page through customers, newest first, optionally matching email or name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<CustomerSummary>, RepositoryError> {
        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM storefront.user u
            WHERE u.role = 'customer'
              AND ($1::TEXT IS NULL OR u.email ILIKE $1 OR u.name ILIKE $1)
            ",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<CustomerRow> = sqlx::query_as(&format!(
            r"
            {CUSTOMER_SELECT}
              AND ($1::TEXT IS NULL OR u.email ILIKE $1 OR u.name ILIKE $1)
            GROUP BY u.id
            ORDER BY u.created_at DESC, u.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(pattern.as_deref())
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows.into_iter().map(CustomerSummary::from).collect();
        Ok(Paginated::new(items, page, count(total)))
    }

    /// One customer's summary.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: UserId) -> Result<Option<CustomerSummary>, RepositoryError> {
        let row: Option<CustomerRow> = sqlx::query_as(&format!(
            r"
            {CUSTOMER_SELECT}
              AND u.id = $1
            GROUP BY u.id
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(CustomerSummary::from))
    }
}
