//! Estimated delivery dates.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Lead time for standard shipping, in days.
pub const STANDARD_LEAD_DAYS: u64 = 5;

/// Lead time for express shipping, in days.
pub const EXPRESS_LEAD_DAYS: u64 = 2;

/// Extra days for remote regions.
pub const REMOTE_EXTRA_DAYS: u64 = 2;

/// Pincode prefixes served by remote courier routes (Bihar, Jharkhand,
/// North-East and nearby regions).
pub const REMOTE_PINCODE_PREFIXES: [&str; 10] =
    ["79", "80", "81", "82", "83", "84", "85", "86", "87", "88"];

/// Shipping speed chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    #[default]
    Standard,
    Express,
}

impl DeliveryType {
    /// Base lead time in days.
    #[must_use]
    pub const fn lead_days(self) -> u64 {
        match self {
            Self::Standard => STANDARD_LEAD_DAYS,
            Self::Express => EXPRESS_LEAD_DAYS,
        }
    }

    /// Stored/serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Express => "express",
        }
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = crate::types::ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "express" => Ok(Self::Express),
            _ => Err(crate::types::ParseStatusError {
                kind: "delivery type",
                value: s.to_owned(),
            }),
        }
    }
}

/// Whether a pincode falls in a remote region.
#[must_use]
pub fn is_remote_pincode(pincode: &str) -> bool {
    pincode
        .get(..2)
        .is_some_and(|prefix| REMOTE_PINCODE_PREFIXES.contains(&prefix))
}

/// Number of days from order date to expected delivery.
#[must_use]
pub fn delivery_days(pincode: &str, delivery_type: DeliveryType) -> u64 {
    let extra = if is_remote_pincode(pincode) {
        REMOTE_EXTRA_DAYS
    } else {
        0
    };
    delivery_type.lead_days() + extra
}

/// Expected delivery date for an order placed on `ordered_on`.
///
/// Returns `None` only if the date arithmetic overflows.
#[must_use]
pub fn estimated_delivery(
    ordered_on: NaiveDate,
    pincode: &str,
    delivery_type: DeliveryType,
) -> Option<NaiveDate> {
    ordered_on.checked_add_days(Days::new(delivery_days(pincode, delivery_type)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_standard_delivery() {
        let eta = estimated_delivery(date(2026, 10, 17), "110001", DeliveryType::Standard);
        assert_eq!(eta, Some(date(2026, 10, 22)));
    }

    #[test]
    fn test_express_delivery() {
        let eta = estimated_delivery(date(2026, 10, 17), "400001", DeliveryType::Express);
        assert_eq!(eta, Some(date(2026, 10, 19)));
    }

    #[test]
    fn test_remote_pincode_adds_days() {
        assert!(is_remote_pincode("847301"));
        assert!(is_remote_pincode("790001"));
        assert!(!is_remote_pincode("890001"));
        assert!(!is_remote_pincode("7"));

        let eta = estimated_delivery(date(2026, 12, 29), "847301", DeliveryType::Standard);
        assert_eq!(eta, Some(date(2027, 1, 5)));
        assert_eq!(delivery_days("781001", DeliveryType::Express), 4);
    }
}
