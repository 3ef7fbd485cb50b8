//! Dashboard aggregates for the back-office.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tracing::instrument;

use hey_harvest_core::{OrderStatus, ProductId};

use super::{RepositoryError, count, non_negative};

/// Products at or below this inventory show up as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// How many best sellers the dashboard lists.
pub const TOP_PRODUCTS: i64 = 5;

/// Days covered by the revenue chart.
pub const REVENUE_WINDOW_DAYS: i32 = 30;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub product_id: ProductId,
    pub name: String,
    pub units_sold: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockProduct {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub inventory: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
    pub orders: u64,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Sum of paid order totals.
    pub total_revenue: Decimal,
    pub total_orders: u64,
    pub orders_by_status: Vec<StatusCount>,
    pub total_customers: u64,
    pub active_subscribers: u64,
    pub top_products: Vec<TopProduct>,
    pub low_stock: Vec<LowStockProduct>,
    pub revenue_by_day: Vec<DailyRevenue>,
}

pub struct AnalyticsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AnalyticsRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<Dashboard, RepositoryError> {
        let (total_revenue, total_orders): (Decimal, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'paid'), 0),
                   COUNT(*)
            FROM storefront.order
            ",
        )
        .fetch_one(self.pool)
        .await?;

        let status_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT order_status, COUNT(*) FROM storefront.order GROUP BY order_status",
        )
        .fetch_all(self.pool)
        .await?;
        let mut orders_by_status = Vec::with_capacity(OrderStatus::ALL.len());
        for status in OrderStatus::ALL {
            let n = status_rows
                .iter()
                .find(|(s, _)| s == status.as_str())
                .map_or(0, |(_, n)| count(*n));
            orders_by_status.push(StatusCount { status, count: n });
        }

        let (total_customers,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.user WHERE role = 'customer'")
                .fetch_one(self.pool)
                .await?;

        let (active_subscribers,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM storefront.newsletter_subscription WHERE is_active",
        )
        .fetch_one(self.pool)
        .await?;

        let top_rows: Vec<(ProductId, String, i64, Decimal)> = sqlx::query_as(
            r"
            SELECT oi.product_id, MAX(oi.product_name), SUM(oi.quantity)::INT8, SUM(oi.line_total)
            FROM storefront.order_item oi
            JOIN storefront.order o ON o.id = oi.order_id
            WHERE o.order_status NOT IN ('cancelled', 'returned')
            GROUP BY oi.product_id
            ORDER BY SUM(oi.quantity) DESC, oi.product_id
            LIMIT $1
            ",
        )
        .bind(TOP_PRODUCTS)
        .fetch_all(self.pool)
        .await?;
        let top_products = top_rows
            .into_iter()
            .map(|(product_id, name, units, revenue)| TopProduct {
                product_id,
                name,
                units_sold: count(units),
                revenue,
            })
            .collect();

        let low_rows: Vec<(ProductId, String, String, i32)> = sqlx::query_as(
            r"
            SELECT id, name, sku, inventory
            FROM storefront.product
            WHERE is_active AND inventory <= $1
            ORDER BY inventory, name
            ",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_all(self.pool)
        .await?;
        let low_stock = low_rows
            .into_iter()
            .map(|(id, name, sku, inventory)| {
                Ok(LowStockProduct {
                    id,
                    name,
                    sku,
                    inventory: non_negative(inventory, "inventory")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let day_rows: Vec<(NaiveDate, Decimal, i64)> = sqlx::query_as(
            r"
            SELECT d.day::DATE,
                   COALESCE(SUM(o.total_amount), 0),
                   COUNT(o.id)
            FROM generate_series(CURRENT_DATE - ($1::INT4 - 1), CURRENT_DATE, INTERVAL '1 day') AS d(day)
            LEFT JOIN storefront.order o
                   ON o.created_at::DATE = d.day::DATE AND o.payment_status = 'paid'
            GROUP BY d.day
            ORDER BY d.day
            ",
        )
        .bind(REVENUE_WINDOW_DAYS)
        .fetch_all(self.pool)
        .await?;
        let revenue_by_day = day_rows
            .into_iter()
            .map(|(date, revenue, orders)| DailyRevenue {
                date,
                revenue,
                orders: count(orders),
            })
            .collect();

        Ok(Dashboard {
            total_revenue,
            total_orders: count(total_orders),
            orders_by_status,
            total_customers: count(total_customers),
            active_subscribers: count(active_subscribers),
            top_products,
            low_stock,
            revenue_by_day,
        })
    }
}
