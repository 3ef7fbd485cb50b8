//! Coupon lookup.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use hey_harvest_core::pricing::Coupon;

use super::{RepositoryError, parse_column};

#[derive(Debug, FromRow)]
struct CouponRow {
    code: String,
    kind: String,
    value: Decimal,
    min_order_amount: Decimal,
    max_discount: Option<Decimal>,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        Ok(Self {
            code: row.code,
            kind: parse_column(&row.kind, "kind")?,
            value: row.value,
            min_order_amount: row.min_order_amount,
            max_discount: row.max_discount,
            is_active: row.is_active,
            expires_at: row.expires_at,
        })
    }
}

/// Repository for discount codes.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a coupon by code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        let row: Option<CouponRow> = sqlx::query_as(
            r"
            SELECT code, kind, value, min_order_amount, max_discount, is_active, expires_at
            FROM storefront.coupon
            WHERE upper(code) = upper($1)
            ",
        )
        .bind(code.trim())
        .fetch_optional(self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Insert or replace a coupon (used by the seeder).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, coupon: &Coupon) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.coupon
                (code, kind, value, min_order_amount, max_discount, is_active, expires_at)
            VALUES (upper($1), $2, $3, $4, $5, $6, $7)
            ON CONFLICT (upper(code)) DO UPDATE
            SET kind = EXCLUDED.kind, value = EXCLUDED.value,
                min_order_amount = EXCLUDED.min_order_amount,
                max_discount = EXCLUDED.max_discount, is_active = EXCLUDED.is_active,
                expires_at = EXCLUDED.expires_at
            ",
        )
        .bind(&coupon.code)
        .bind(coupon.kind.as_str())
        .bind(coupon.value)
        .bind(coupon.min_order_amount)
        .bind(coupon.max_discount)
        .bind(coupon.is_active)
        .bind(coupon.expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
