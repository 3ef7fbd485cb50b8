//! Human-facing identifiers: SKUs, tracking numbers and order numbers.
//!
//! None of these are unique on their own. The database holds a `UNIQUE`
//! constraint on each column and the repositories retry with a fresh value
//! on conflict (see [`MAX_GENERATION_ATTEMPTS`]).

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::types::{Category, Size};

/// How many times a repository regenerates an identifier after a unique
/// constraint violation before giving up.
pub const MAX_GENERATION_ATTEMPTS: usize = 5;

/// Category code used when the category is not recognized.
pub const DEFAULT_CATEGORY_CODE: &str = "HH";

/// Size code used when the size is not recognized.
pub const DEFAULT_SIZE_CODE: &str = "200G";

/// Prefix of every tracking number and order number.
pub const STORE_PREFIX: &str = "HH";

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Build a SKU such as `P4S-1216-0042`.
///
/// `category` and `size` may be either keys or labels; unknown values fall
/// back to [`DEFAULT_CATEGORY_CODE`] / [`DEFAULT_SIZE_CODE`]. The suffix is the
/// last four digits of `serial`, zero padded.
///
/// ```
/// use hey_harvest_core::identifiers::generate_sku;
///
/// assert_eq!(generate_sku("Pure 4 Suta", "12-16mm", 123_456), "P4S-1216-3456");
/// assert_eq!(generate_sku("Gift Box", "1kg", 7), "HH-200G-0007");
/// ```
#[must_use]
pub fn generate_sku(category: &str, size: &str, serial: u64) -> String {
    let category_code = category
        .parse::<Category>()
        .map_or(DEFAULT_CATEGORY_CODE, Category::sku_code);
    let size_code = size.parse::<Size>().map_or(DEFAULT_SIZE_CODE, Size::sku_code);

    format!("{category_code}-{size_code}-{:04}", serial % 10_000)
}

/// Build a tracking number: prefix, last 8 digits of the epoch milliseconds,
/// then 6 random base-36 characters.
#[must_use]
pub fn generate_tracking_number<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 100_000_000;
    let tail: String = (0..6)
        .map(|_| {
            BASE36
                .get(rng.random_range(0..BASE36.len()))
                .copied()
                .map_or('0', char::from)
        })
        .collect();

    format!("{STORE_PREFIX}{millis:08}{tail}")
}

/// Build the display order number, e.g. `HH20261017000042`.
///
/// `serial` comes from the order-number sequence; the last six digits are used.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>, serial: u64) -> String {
    format!(
        "{STORE_PREFIX}{}{:06}",
        now.format("%Y%m%d"),
        serial % 1_000_000
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_sku_for_known_category_and_size() {
        let sku = generate_sku("Pure 4 Suta", "12-16mm", 1_729_150_000_123);
        assert!(sku.starts_with("P4S-1216-"));
        let suffix = &sku["P4S-1216-".len()..];
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_sku_accepts_keys() {
        assert_eq!(generate_sku("flavoured_makhana", "20_24mm", 5), "FLV-2024-0005");
    }

    #[test]
    fn test_sku_defaults() {
        assert_eq!(generate_sku("", "", 10_000), "HH-200G-0000");
    }

    #[test]
    fn test_tracking_number_shape() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let tracking = generate_tracking_number(now, &mut rng);

        assert_eq!(tracking.len(), 2 + 8 + 6);
        assert!(tracking.starts_with("HH"));
        let millis = format!("{:08}", now.timestamp_millis() % 100_000_000);
        assert_eq!(&tracking[2..10], millis);
        assert!(
            tracking[10..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_tracking_numbers_differ_with_same_clock() {
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(11);
        let a = generate_tracking_number(now, &mut rng);
        let b = generate_tracking_number(now, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_order_number() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 0, 0, 0).unwrap();
        assert_eq!(generate_order_number(now, 42), "HH20261017000042");
        assert_eq!(generate_order_number(now, 1_000_042), "HH20261017000042");
    }
}
