//! Product catalog repository.
//!
//! Listing uses `QueryBuilder` so optional filters only add the predicates
//! they need. Prices are filtered on the effective price
//! (`COALESCE(discount_price, price)`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use hey_harvest_core::cart::effective_price;
use hey_harvest_core::identifiers::{MAX_GENERATION_ATTEMPTS, generate_sku};
use hey_harvest_core::pagination::{PageRequest, Paginated};
use hey_harvest_core::{Category, ProductId, Size};

use super::{RepositoryError, count, is_unique_violation_on, non_negative, parse_column};
use crate::models::{CategoryCount, Product};

pub(crate) const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.category, p.size, \
    p.price, p.discount_price, p.weight_grams, p.inventory, p.sku, p.images, \
    p.average_rating, p.total_reviews, p.is_active, p.is_featured, p.created_at, p.updated_at";

/// Default page size for product listings.
pub const PRODUCT_PAGE_SIZE: u32 = 12;

/// Maximum number of products on the featured shelf.
pub const FEATURED_LIMIT: i64 = 8;

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    category: String,
    size: String,
    price: Decimal,
    discount_price: Option<Decimal>,
    weight_grams: i32,
    inventory: i32,
    sku: String,
    images: Vec<String>,
    average_rating: Decimal,
    total_reviews: i32,
    is_active: bool,
    is_featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            category: parse_column(&row.category, "category")?,
            size: parse_column(&row.size, "size")?,
            effective_price: effective_price(row.price, row.discount_price),
            price: row.price,
            discount_price: row.discount_price,
            weight_grams: non_negative(row.weight_grams, "weight_grams")?,
            inventory: non_negative(row.inventory, "inventory")?,
            total_reviews: non_negative(row.total_reviews, "total_reviews")?,
            name: row.name,
            description: row.description,
            sku: row.sku,
            images: row.images,
            average_rating: row.average_rating,
            is_active: row.is_active,
            is_featured: row.is_featured,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Rating,
    Name,
}

impl ProductSort {
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY p.created_at DESC, p.id DESC",
            Self::PriceAsc => " ORDER BY COALESCE(p.discount_price, p.price) ASC, p.id",
            Self::PriceDesc => " ORDER BY COALESCE(p.discount_price, p.price) DESC, p.id",
            Self::Rating => " ORDER BY p.average_rating DESC, p.total_reviews DESC, p.id",
            Self::Name => " ORDER BY p.name ASC, p.id",
        }
    }
}

/// Catalog filters. `None` means "don't filter".
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category: Option<Category>,
    pub size: Option<Size>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub in_stock: Option<bool>,
    /// Storefront listings pin this to `Some(true)`; admin may leave it open.
    pub is_active: Option<bool>,
}

impl ProductFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(category) = self.category {
            qb.push(" AND p.category = ").push_bind(category.key());
        }
        if let Some(size) = self.size {
            qb.push(" AND p.size = ").push_bind(size.key());
        }
        if let Some(min) = self.min_price {
            qb.push(" AND COALESCE(p.discount_price, p.price) >= ")
                .push_bind(min);
        }
        if let Some(max) = self.max_price {
            qb.push(" AND COALESCE(p.discount_price, p.price) <= ")
                .push_bind(max);
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (p.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.description ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(featured) = self.featured {
            qb.push(" AND p.is_featured = ").push_bind(featured);
        }
        match self.in_stock {
            Some(true) => {
                qb.push(" AND p.inventory > 0");
            }
            Some(false) => {
                qb.push(" AND p.inventory = 0");
            }
            None => {}
        }
        if let Some(active) = self.is_active {
            qb.push(" AND p.is_active = ").push_bind(active);
        }
    }
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Editable product fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub category: Category,
    pub size: Size,
    pub price: Decimal,
    pub discount_price: Option<Decimal>,
    pub weight_grams: u32,
    pub inventory: u32,
    pub images: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
}

/// Repository for catalog reads and admin writes.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Page through products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        sort: ProductSort,
        page: PageRequest,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM storefront.product p");
        filter.push_where(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM storefront.product p"));
        filter.push_where(&mut qb);
        qb.push(sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(page.sql_limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::new(items, page, count(total)))
    }

    /// Featured active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product p
            WHERE p.is_active AND p.is_featured
            ORDER BY p.created_at DESC
            LIMIT $1
            "
        ))
        .bind(FEATURED_LIMIT)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Every category with its count of active products (zero included).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<CategoryCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT category, COUNT(*)
            FROM storefront.product
            WHERE is_active
            GROUP BY category
            ",
        )
        .fetch_all(self.pool)
        .await?;

        let mut counts = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let n = rows
                .iter()
                .find(|(key, _)| key == category.key())
                .map_or(0, |(_, n)| count(*n));
            counts.push(CategoryCount {
                category,
                label: category.label(),
                count: n,
            });
        }
        Ok(counts)
    }

    /// Get a product by ID regardless of its active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    /// Get several products by ID. Missing IDs are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.product p WHERE p.id = ANY($1)"
        ))
        .bind(raw)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Whether a product with this name already exists in the given variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(
        &self,
        name: &str,
        category: Category,
        size: Size,
    ) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.product
                WHERE lower(name) = lower($1) AND category = $2 AND size = $3
            )
            ",
        )
        .bind(name)
        .bind(category.key())
        .bind(size.key())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a product with a generated SKU.
    ///
    /// The SKU suffix comes from `storefront.sku_serial`; on a collision a new
    /// serial is drawn, up to `MAX_GENERATION_ATTEMPTS` times.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if every attempt collides.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let (serial,): (i64,) = sqlx::query_as("SELECT nextval('storefront.sku_serial')")
                .fetch_one(self.pool)
                .await?;
            let sku = generate_sku(
                input.category.key(),
                input.size.key(),
                u64::try_from(serial).unwrap_or_default(),
            );

            let result: Result<ProductRow, sqlx::Error> = sqlx::query_as(&format!(
                r"
                INSERT INTO storefront.product AS p
                    (name, description, category, size, price, discount_price, weight_grams,
                     inventory, sku, images, is_active, is_featured)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                RETURNING {PRODUCT_COLUMNS}
                "
            ))
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.key())
            .bind(input.size.key())
            .bind(input.price)
            .bind(input.discount_price)
            .bind(to_i32(input.weight_grams))
            .bind(to_i32(input.inventory))
            .bind(&sku)
            .bind(&input.images)
            .bind(input.is_active)
            .bind(input.is_featured)
            .fetch_one(self.pool)
            .await;

            match result {
                Ok(row) => return Product::try_from(row),
                Err(e) if is_unique_violation_on(&e, "product_sku_key") => {
                    tracing::warn!(attempt, %sku, "SKU collision, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(RepositoryError::Conflict(
            "could not generate a unique SKU".to_owned(),
        ))
    }

    /// Replace a product's editable fields. The SKU never changes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.product AS p
            SET name = $2, description = $3, category = $4, size = $5, price = $6,
                discount_price = $7, weight_grams = $8, inventory = $9, images = $10,
                is_active = $11, is_featured = $12, updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.category.key())
        .bind(input.size.key())
        .bind(input.price)
        .bind(input.discount_price)
        .bind(to_i32(input.weight_grams))
        .bind(to_i32(input.inventory))
        .bind(&input.images)
        .bind(input.is_active)
        .bind(input.is_featured)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Product::try_from)
    }

    /// Flip the active flag (soft delete / restore).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    pub async fn toggle_active(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.product AS p
            SET is_active = NOT p.is_active, updated_at = NOW()
            WHERE p.id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Product::try_from)
    }

    /// Add `delta` units (negative to remove) to a product's inventory.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if inventory would go negative.
    pub async fn adjust_inventory(
        &self,
        id: ProductId,
        delta: i32,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.product AS p
            SET inventory = p.inventory + $2, updated_at = NOW()
            WHERE p.id = $1 AND p.inventory + $2 >= 0
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(delta)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Product::try_from(row),
            None if self.get(id).await?.is_some() => Err(RepositoryError::Conflict(
                "inventory cannot go below zero".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }
}

pub(crate) fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(filter: &ProductFilter) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM storefront.product p");
        filter.push_where(&mut qb);
        qb.into_sql()
    }

    #[test]
    fn test_empty_filter_adds_no_predicates() {
        assert_eq!(
            sql_for(&ProductFilter::default()),
            "SELECT 1 FROM storefront.product p WHERE TRUE"
        );
    }

    #[test]
    fn test_filters_bind_in_order() {
        let filter = ProductFilter {
            category: Some(Category::Pure5Suta),
            min_price: Some(Decimal::from(100)),
            search: Some("roasted".to_string()),
            in_stock: Some(true),
            is_active: Some(true),
            ..ProductFilter::default()
        };
        let sql = sql_for(&filter);

        assert!(sql.contains("p.category = $1"));
        assert!(sql.contains("COALESCE(p.discount_price, p.price) >= $2"));
        assert!(sql.contains("p.name ILIKE $3 OR p.description ILIKE $4"));
        assert!(sql.contains("p.inventory > 0"));
        assert!(sql.contains("p.is_active = $5"));
    }

    #[test]
    fn test_blank_search_ignored() {
        let filter = ProductFilter {
            search: Some("   ".to_string()),
            ..ProductFilter::default()
        };
        assert!(!sql_for(&filter).contains("ILIKE"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("makhana"), "makhana");
    }

    #[test]
    fn test_sort_parses_query_values() {
        let sort: ProductSort = serde_json::from_str("\"price_desc\"").unwrap_or_default();
        assert_eq!(sort, ProductSort::PriceDesc);
        assert!(ProductSort::Rating.order_by().contains("average_rating"));
    }
}
