//! Order repository.
//!
//! Placement, status transitions and payment updates each run in a single
//! transaction. Inventory is decremented with a conditional `UPDATE` so two
//! concurrent checkouts can never oversell; tracking numbers rely on the
//! `UNIQUE` constraint and are retried inside a savepoint.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{Acquire, FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::instrument;

use hey_harvest_core::delivery::DeliveryType;
use hey_harvest_core::identifiers::{
    MAX_GENERATION_ATTEMPTS, generate_order_number, generate_tracking_number,
};
use hey_harvest_core::pagination::{PageRequest, Paginated};
use hey_harvest_core::pricing::OrderTotals;
use hey_harvest_core::review::PurchasedOrder;
use hey_harvest_core::{
    OrderId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::products::{escape_like, to_i32};
use super::{RepositoryError, count, is_unique_violation_on, non_negative, parse_column};
use crate::models::{AddressDetails, Order, OrderItem, OrderSummary, StatusHistoryEntry};

const ORDER_COLUMNS: &str = "o.id, o.order_number, o.user_id, o.subtotal, o.discount_amount, \
    o.coupon_code, o.shipping_charges, o.tax_amount, o.cod_charges, o.total_amount, \
    o.payment_method, o.payment_status, o.order_status, o.shipping_address, o.billing_address, \
    o.tracking_number, o.gateway_order_id, o.gateway_payment_id, o.delivery_type, \
    o.estimated_delivery, o.created_at, o.updated_at";

const SUMMARY_SELECT: &str = r"
    SELECT o.id, o.order_number, o.user_id, u.email AS customer_email,
           u.name AS customer_name,
           COALESCE((SELECT SUM(oi.quantity) FROM storefront.order_item oi
                     WHERE oi.order_id = o.id), 0)::INT4 AS item_count,
           o.total_amount, o.payment_method, o.payment_status, o.order_status,
           o.tracking_number, o.created_at
    FROM storefront.order o
    JOIN storefront.user u ON u.id = o.user_id";

/// Upper bound on rows in a CSV export.
pub const EXPORT_LIMIT: i64 = 10_000;

#[derive(Debug, FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    subtotal: Decimal,
    discount_amount: Decimal,
    coupon_code: Option<String>,
    shipping_charges: Decimal,
    tax_amount: Decimal,
    cod_charges: Decimal,
    total_amount: Decimal,
    payment_method: String,
    payment_status: String,
    order_status: String,
    shipping_address: Json<AddressDetails>,
    billing_address: Option<Json<AddressDetails>>,
    tracking_number: Option<String>,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    delivery_type: String,
    estimated_delivery: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(
        self,
        items: Vec<OrderItem>,
        status_history: Vec<StatusHistoryEntry>,
    ) -> Result<Order, RepositoryError> {
        Ok(Order {
            id: self.id,
            order_number: self.order_number,
            user_id: self.user_id,
            items,
            totals: OrderTotals {
                subtotal: self.subtotal,
                discount_amount: self.discount_amount,
                shipping_charges: self.shipping_charges,
                tax_amount: self.tax_amount,
                cod_charges: self.cod_charges,
                total_amount: self.total_amount,
            },
            coupon_code: self.coupon_code,
            payment_method: parse_column(&self.payment_method, "payment_method")?,
            payment_status: parse_column(&self.payment_status, "payment_status")?,
            order_status: parse_column(&self.order_status, "order_status")?,
            shipping_address: self.shipping_address.0,
            billing_address: self.billing_address.map(|json| json.0),
            tracking_number: self.tracking_number,
            gateway_order_id: self.gateway_order_id,
            gateway_payment_id: self.gateway_payment_id,
            delivery_type: parse_column(&self.delivery_type, "delivery_type")?,
            estimated_delivery: self.estimated_delivery,
            status_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderItemRow {
    product_id: ProductId,
    product_name: String,
    sku: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            product_name: row.product_name,
            sku: row.sku,
            quantity: non_negative(row.quantity, "quantity")?,
            unit_price: row.unit_price,
            line_total: row.line_total,
        })
    }
}

#[derive(Debug, FromRow)]
struct HistoryRow {
    status: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<HistoryRow> for StatusHistoryEntry {
    type Error = RepositoryError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: parse_column(&row.status, "status")?,
            note: row.note,
            timestamp: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    customer_email: String,
    customer_name: String,
    item_count: i32,
    total_amount: Decimal,
    payment_method: String,
    payment_status: String,
    order_status: String,
    tracking_number: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SummaryRow> for OrderSummary {
    type Error = RepositoryError;

    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            customer_email: row.customer_email,
            customer_name: row.customer_name,
            item_count: non_negative(row.item_count, "item_count")?,
            total_amount: row.total_amount,
            payment_method: parse_column(&row.payment_method, "payment_method")?,
            payment_status: parse_column(&row.payment_status, "payment_status")?,
            order_status: parse_column(&row.order_status, "order_status")?,
            tracking_number: row.tracking_number,
            created_at: row.created_at,
        })
    }
}

/// A priced line ready to be written.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Everything needed to place an order.
#[derive(Debug, Clone)]
pub struct NewOrder<'a> {
    pub user_id: UserId,
    pub lines: &'a [NewOrderLine],
    pub totals: OrderTotals,
    pub coupon_code: Option<&'a str>,
    pub payment_method: PaymentMethod,
    pub shipping_address: &'a AddressDetails,
    pub billing_address: Option<&'a AddressDetails>,
    pub delivery_type: DeliveryType,
    pub estimated_delivery: Option<NaiveDate>,
    /// Empty the customer's cart in the same transaction.
    pub clear_cart: bool,
}

/// Back-office order filters.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    /// Matches order number or customer email.
    pub search: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<UserId>,
}

impl OrderFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(status) = self.status {
            qb.push(" AND o.order_status = ").push_bind(status.as_str());
        }
        if let Some(payment) = self.payment_status {
            qb.push(" AND o.payment_status = ").push_bind(payment.as_str());
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (o.order_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR u.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(from) = self.from {
            qb.push(" AND o.created_at >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            qb.push(" AND o.created_at < (")
                .push_bind(to)
                .push("::date + 1)");
        }
        if let Some(user_id) = self.user_id {
            qb.push(" AND o.user_id = ").push_bind(user_id);
        }
    }
}

/// Lines in ascending product id, the order every transaction locks
/// product rows in.
fn lock_order(lines: &[NewOrderLine]) -> Vec<&NewOrderLine> {
    let mut sorted: Vec<_> = lines.iter().collect();
    sorted.sort_by_key(|line| line.product_id);
    sorted
}

/// Repository for orders, their lines and status history.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if any line is out of stock or its
    /// product is inactive; nothing is written in that case.
    #[instrument(skip(self, order), fields(user_id = %order.user_id))]
    pub async fn create(&self, order: &NewOrder<'_>) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for line in lock_order(order.lines) {
            let updated: Option<(ProductId,)> = sqlx::query_as(
                r"
                UPDATE storefront.product
                SET inventory = inventory - $2, updated_at = NOW()
                WHERE id = $1 AND is_active AND inventory >= $2
                RETURNING id
                ",
            )
            .bind(line.product_id)
            .bind(to_i32(line.quantity))
            .fetch_optional(&mut *tx)
            .await?;

            if updated.is_none() {
                return Err(RepositoryError::Conflict(format!(
                    "{} is out of stock",
                    line.product_name
                )));
            }
        }

        let now = Utc::now();
        let (serial,): (i64,) = sqlx::query_as("SELECT nextval('storefront.order_number_serial')")
            .fetch_one(&mut *tx)
            .await?;
        let order_number = generate_order_number(now, u64::try_from(serial).unwrap_or_default());

        let (order_id,): (OrderId,) = sqlx::query_as(
            r"
            INSERT INTO storefront.order
                (order_number, user_id, subtotal, discount_amount, coupon_code, shipping_charges,
                 tax_amount, cod_charges, total_amount, payment_method, shipping_address,
                 billing_address, delivery_type, estimated_delivery)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING id
            ",
        )
        .bind(&order_number)
        .bind(order.user_id)
        .bind(order.totals.subtotal)
        .bind(order.totals.discount_amount)
        .bind(order.coupon_code)
        .bind(order.totals.shipping_charges)
        .bind(order.totals.tax_amount)
        .bind(order.totals.cod_charges)
        .bind(order.totals.total_amount)
        .bind(order.payment_method.as_str())
        .bind(Json(order.shipping_address))
        .bind(order.billing_address.map(Json))
        .bind(order.delivery_type.as_str())
        .bind(order.estimated_delivery)
        .fetch_one(&mut *tx)
        .await?;

        for line in order.lines {
            sqlx::query(
                r"
                INSERT INTO storefront.order_item
                    (order_id, product_id, product_name, sku, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(&line.sku)
            .bind(to_i32(line.quantity))
            .bind(line.unit_price)
            .bind(line.unit_price * Decimal::from(line.quantity))
            .execute(&mut *tx)
            .await?;
        }

        push_history(&mut tx, order_id, OrderStatus::Pending, Some("Order placed")).await?;

        if order.clear_cart {
            sqlx::query("DELETE FROM storefront.cart_item WHERE user_id = $1")
                .bind(order.user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(%order_id, %order_number, "Order placed");

        self.get(order_id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get an order with its lines and history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.fetch(id, None).await
    }

    /// Get an order only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        self.fetch(id, Some(user_id)).await
    }

    async fn fetch(
        &self,
        id: OrderId,
        owner: Option<UserId>,
    ) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM storefront.order o
            WHERE o.id = $1 AND ($2::INT4 IS NULL OR o.user_id = $2)
            "
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT product_id, product_name, sku, quantity, unit_price, line_total
            FROM storefront.order_item
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let history: Vec<HistoryRow> = sqlx::query_as(
            r"
            SELECT status, note, created_at
            FROM storefront.order_status_history
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        let items = items
            .into_iter()
            .map(OrderItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let history = history
            .into_iter()
            .map(StatusHistoryEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        row.into_order(items, history).map(Some)
    }

    /// Page through order summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &OrderFilter,
        page: PageRequest,
    ) -> Result<Paginated<OrderSummary>, RepositoryError> {
        let mut count_qb = QueryBuilder::new(
            "SELECT COUNT(*) FROM storefront.order o JOIN storefront.user u ON u.id = o.user_id",
        );
        filter.push_where(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(self.pool).await?;

        let items = self
            .summaries(filter, page.sql_limit(), page.offset())
            .await?;
        Ok(Paginated::new(items, page, count(total)))
    }

    /// Every summary matching `filter`, capped at [`EXPORT_LIMIT`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn export(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, RepositoryError> {
        self.summaries(filter, EXPORT_LIMIT, 0).await
    }

    async fn summaries(
        &self,
        filter: &OrderFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<OrderSummary>, RepositoryError> {
        let mut qb = QueryBuilder::new(SUMMARY_SELECT);
        filter.push_where(&mut qb);
        qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<SummaryRow> = qb.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(OrderSummary::try_from).collect()
    }

    /// Move an order to `next`, applying the side effects of the new status.
    ///
    /// - `Shipped` assigns a tracking number if there is none.
    /// - `Delivered` marks a cash-on-delivery order paid.
    /// - `Cancelled` returns every line's quantity to inventory.
    ///
    /// When `owner` is set the order must belong to that user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    #[instrument(skip(self, note))]
    pub async fn transition(
        &self,
        id: OrderId,
        next: OrderStatus,
        note: Option<&str>,
        owner: Option<UserId>,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(String, String, Option<String>)> = sqlx::query_as(
            r"
            SELECT order_status, payment_method, tracking_number
            FROM storefront.order
            WHERE id = $1 AND ($2::INT4 IS NULL OR user_id = $2)
            FOR UPDATE
            ",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((status, method, tracking)) = locked else {
            return Err(RepositoryError::NotFound);
        };
        let current: OrderStatus = parse_column(&status, "order_status")?;
        let method: PaymentMethod = parse_column(&method, "payment_method")?;

        if owner.is_some() && next == OrderStatus::Cancelled && !current.is_customer_cancellable() {
            return Err(RepositoryError::Conflict(
                "order can no longer be cancelled".to_owned(),
            ));
        }
        current
            .transition(next)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        if next == OrderStatus::Shipped && tracking.is_none() {
            assign_tracking_number(&mut tx, id).await?;
        }

        let mark_paid = next == OrderStatus::Delivered && method == PaymentMethod::Cod;
        sqlx::query(
            r"
            UPDATE storefront.order
            SET order_status = $2,
                payment_status = CASE WHEN $3 THEN 'paid' ELSE payment_status END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(next.as_str())
        .bind(mark_paid)
        .execute(&mut *tx)
        .await?;

        if next == OrderStatus::Cancelled {
            sqlx::query(
                r"
                SELECT p.id FROM storefront.product p
                WHERE p.id IN (SELECT product_id FROM storefront.order_item WHERE order_id = $1)
                ORDER BY p.id
                FOR UPDATE
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                r"
                UPDATE storefront.product p
                SET inventory = p.inventory + l.quantity, updated_at = NOW()
                FROM (
                    SELECT product_id, SUM(quantity)::INT4 AS quantity
                    FROM storefront.order_item
                    WHERE order_id = $1
                    GROUP BY product_id
                ) l
                WHERE p.id = l.product_id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        push_history(&mut tx, id, next, note).await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Store the payment gateway's order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_gateway_order(
        &self,
        id: OrderId,
        gateway_order_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.order SET gateway_order_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(gateway_order_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Find a customer's order by its gateway order id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn find_by_gateway_order(
        &self,
        user_id: UserId,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError> {
        let id: Option<(OrderId,)> = sqlx::query_as(
            "SELECT id FROM storefront.order WHERE gateway_order_id = $1 AND user_id = $2",
        )
        .bind(gateway_order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        match id {
            Some((id,)) => self.get(id).await,
            None => Ok(None),
        }
    }

    /// Record a verified payment; a pending order moves to confirmed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Conflict` if the order was cancelled.
    #[instrument(skip(self))]
    pub async fn mark_paid(
        &self,
        id: OrderId,
        gateway_payment_id: &str,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(String,)> =
            sqlx::query_as("SELECT order_status FROM storefront.order WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((status,)) = locked else {
            return Err(RepositoryError::NotFound);
        };
        let current: OrderStatus = parse_column(&status, "order_status")?;
        if current == OrderStatus::Cancelled {
            return Err(RepositoryError::Conflict(
                "order was cancelled before the payment arrived".to_owned(),
            ));
        }
        let confirm = current == OrderStatus::Pending;

        sqlx::query(
            r"
            UPDATE storefront.order
            SET payment_status = 'paid', gateway_payment_id = $2,
                order_status = CASE WHEN $3 THEN 'confirmed' ELSE order_status END,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(gateway_payment_id)
        .bind(confirm)
        .execute(&mut *tx)
        .await?;

        if confirm {
            push_history(&mut tx, id, OrderStatus::Confirmed, Some("Payment received")).await?;
        }

        tx.commit().await?;
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Record a failed payment verification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_payment_failed(&self, id: OrderId) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE storefront.order
            SET payment_status = 'failed', updated_at = NOW()
            WHERE id = $1 AND payment_status <> 'paid'
            ",
        )
        .bind(id)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// A customer's orders reduced to what the review gate needs.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchased_orders(
        &self,
        user_id: UserId,
    ) -> Result<Vec<PurchasedOrder>, RepositoryError> {
        let rows: Vec<(OrderId, String, Vec<i32>)> = sqlx::query_as(
            r"
            SELECT o.id, o.order_status, ARRAY_AGG(oi.product_id)
            FROM storefront.order o
            JOIN storefront.order_item oi ON oi.order_id = o.id
            WHERE o.user_id = $1
            GROUP BY o.id
            ORDER BY o.id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|(order_id, status, product_ids)| {
                Ok(PurchasedOrder {
                    order_id,
                    status: parse_column(&status, "order_status")?,
                    product_ids: product_ids.into_iter().map(ProductId::new).collect(),
                })
            })
            .collect()
    }
}

async fn push_history(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
    status: OrderStatus,
    note: Option<&str>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO storefront.order_status_history (order_id, status, note) VALUES ($1, $2, $3)",
    )
    .bind(order_id)
    .bind(status.as_str())
    .bind(note)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Give an order a fresh tracking number, retrying on collision.
async fn assign_tracking_number(
    tx: &mut Transaction<'_, Postgres>,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let tracking = generate_tracking_number(Utc::now(), &mut rand::rng());

        let mut savepoint = (&mut **tx).begin().await?;
        let result = sqlx::query("UPDATE storefront.order SET tracking_number = $2 WHERE id = $1")
            .bind(order_id)
            .bind(&tracking)
            .execute(&mut *savepoint)
            .await;

        match result {
            Ok(_) => {
                savepoint.commit().await?;
                return Ok(());
            }
            Err(e) if is_unique_violation_on(&e, "order_tracking_number_key") => {
                savepoint.rollback().await?;
                tracing::warn!(attempt, %tracking, "Tracking number collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(RepositoryError::Conflict(
        "could not generate a unique tracking number".to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &OrderFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new(SUMMARY_SELECT);
        filter.push_where(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn test_order_filter_predicates() {
        let filter = OrderFilter {
            status: Some(OrderStatus::Shipped),
            search: Some("HH2026".to_string()),
            to: NaiveDate::from_ymd_opt(2026, 10, 17),
            ..OrderFilter::default()
        };
        let sql = sql_for(&filter);

        assert!(sql.contains("o.order_status = $1"));
        assert!(sql.contains("o.order_number ILIKE $2 OR u.email ILIKE $3"));
        assert!(sql.contains("o.created_at < ($4::date + 1)"));
        assert!(!sql.contains("o.payment_status ="));
    }

    fn line(id: i32) -> NewOrderLine {
        NewOrderLine {
            product_id: ProductId::new(id),
            product_name: format!("Makhana {id}"),
            sku: format!("HH-{id}"),
            quantity: 1,
            unit_price: Decimal::new(44_900, 2),
        }
    }

    #[test]
    fn test_lines_lock_in_product_order() {
        let forward = [line(4), line(9), line(12)];
        let reverse = [line(12), line(9), line(4)];
        let ids = |lines: &[NewOrderLine]| -> Vec<i32> {
            lock_order(lines).iter().map(|l| l.product_id.as_i32()).collect()
        };

        assert_eq!(ids(&forward), [4, 9, 12]);
        assert_eq!(ids(&reverse), ids(&forward));
    }

    #[test]
    fn test_unfiltered_summary_query() {
        assert!(sql_for(&OrderFilter::default()).ends_with("WHERE TRUE"));
    }
}
