//! Cached catalog reads.
//!
//! Product detail lookups are served from memory for five minutes. Admin
//! writes and review aggregation call [`CatalogCache::invalidate`].

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::{debug, instrument};

use hey_harvest_core::ProductId;

use crate::db::RepositoryError;
use crate::db::products::ProductRepository;
use crate::models::Product;

const PRODUCT_TTL: Duration = Duration::from_secs(300);
const MAX_CACHED_PRODUCTS: u64 = 1000;

/// In-memory product cache shared by all handlers.
#[derive(Clone)]
pub struct CatalogCache {
    products: Cache<ProductId, Arc<Product>>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            products: Cache::builder()
                .max_capacity(MAX_CACHED_PRODUCTS)
                .time_to_live(PRODUCT_TTL)
                .build(),
        }
    }

    /// Fetch a product, active or not, through the cache.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the database lookup fails.
    #[instrument(skip(self, pool))]
    pub async fn product(
        &self,
        pool: &PgPool,
        id: ProductId,
    ) -> Result<Option<Arc<Product>>, RepositoryError> {
        if let Some(product) = self.products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let Some(product) = ProductRepository::new(pool).get(id).await? else {
            return Ok(None);
        };

        let product = Arc::new(product);
        self.products.insert(id, Arc::clone(&product)).await;
        Ok(Some(product))
    }

    /// Drop a product so the next read goes to the database.
    pub async fn invalidate(&self, id: ProductId) {
        self.products.invalidate(&id).await;
    }
}
