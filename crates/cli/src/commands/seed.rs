//! Seed the catalog with products and coupons from a YAML file.
//!
//! Products are matched on name, category and size, so re-running the
//! seed never duplicates them. Coupons are upserted by code.
//!
//! ```yaml
//! products:
//!   - name: Pure Makhana 5 Suta
//!     category: pure_5_suta
//!     size: 16_20mm
//!     price: "449.00"
//!     weightGrams: 250
//!     inventory: 100
//! coupons:
//!   - code: WELCOME10
//!     kind: percent
//!     value: "10"
//!     minOrderAmount: "299"
//!     maxDiscount: "100"
//!     isActive: true
//! ```

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{error, info};

use hey_harvest_core::pricing::{Coupon, CouponKind};
use hey_harvest_core::{Category, Size};
use hey_harvest_storefront::db::products::ProductInput;
use hey_harvest_storefront::db::{CouponRepository, ProductRepository};

use super::connect;

/// Top-level shape of the seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<SeedProduct>,
    #[serde(default)]
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: Category,
    pub size: Size,
    pub price: Decimal,
    #[serde(default)]
    pub discount_price: Option<Decimal>,
    pub weight_grams: u32,
    #[serde(default)]
    pub inventory: u32,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl From<SeedProduct> for ProductInput {
    fn from(p: SeedProduct) -> Self {
        Self {
            name: p.name,
            description: p.description,
            category: p.category,
            size: p.size,
            price: p.price,
            discount_price: p.discount_price,
            weight_grams: p.weight_grams,
            inventory: p.inventory,
            images: p.images,
            is_active: true,
            is_featured: p.is_featured,
        }
    }
}

/// Check a parsed seed file, returning one message per problem.
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();

    for p in &seed.products {
        if p.name.trim().is_empty() {
            errors.push("product with empty name".to_string());
        }
        if p.price <= Decimal::ZERO {
            errors.push(format!("{}: price must be positive", p.name));
        }
        if p.discount_price.is_some_and(|d| d <= Decimal::ZERO || d >= p.price) {
            errors.push(format!("{}: discount price must be below price", p.name));
        }
        if p.weight_grams == 0 {
            errors.push(format!("{}: weight must be positive", p.name));
        }
    }

    let mut codes = HashSet::new();
    for c in &seed.coupons {
        if !codes.insert(c.code.to_uppercase()) {
            errors.push(format!("{}: duplicate coupon code", c.code));
        }
        if c.value <= Decimal::ZERO {
            errors.push(format!("{}: value must be positive", c.code));
        }
        if c.kind == CouponKind::Percent && c.value > Decimal::ONE_HUNDRED {
            errors.push(format!("{}: percent coupons cannot exceed 100", c.code));
        }
    }

    errors
}

/// Load products and coupons from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn catalog(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog seed");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;
    info!(
        products = seed.products.len(),
        coupons = seed.coupons.len(),
        "Parsed seed file"
    );

    let errors = validate(&seed);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Dry run: seed file is valid");
        return Ok(());
    }

    let pool = connect().await?;
    let products = ProductRepository::new(&pool);
    let coupons = CouponRepository::new(&pool);

    let (mut inserted, mut skipped) = (0_usize, 0_usize);
    for product in seed.products {
        if products
            .exists(&product.name, product.category, product.size)
            .await?
        {
            skipped += 1;
            continue;
        }
        let created = products.create(&product.into()).await?;
        info!(sku = %created.sku, "Created {}", created.name);
        inserted += 1;
    }

    for coupon in &seed.coupons {
        coupons.upsert(coupon).await?;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products skipped (already exist): {skipped}");
    info!("  Coupons upserted: {}", seed.coupons.len());

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BUNDLED: &str = include_str!("../../seed/catalog.yaml");

    #[test]
    fn test_bundled_seed_is_valid() {
        let seed: SeedFile = serde_yaml::from_str(BUNDLED).unwrap();
        assert!(!seed.products.is_empty());
        assert!(!seed.coupons.is_empty());
        assert!(validate(&seed).is_empty(), "{:?}", validate(&seed));
    }

    #[test]
    fn test_validate_flags_bad_entries() {
        let seed: SeedFile = serde_yaml::from_str(
            r#"
products:
  - name: Broken
    category: pure_4_suta
    size: 12_16mm
    price: "100"
    discountPrice: "150"
    weightGrams: 0
coupons:
  - code: save
    kind: percent
    value: "120"
    minOrderAmount: "0"
    isActive: true
  - code: SAVE
    kind: flat
    value: "50"
    minOrderAmount: "0"
    isActive: true
"#,
        )
        .unwrap();

        let errors = validate(&seed);
        assert_eq!(errors.len(), 4, "{errors:?}");
    }
}
