//! Indian postal code and mobile number validation.

use std::sync::LazyLock;

use regex::Regex;

/// Six digits, first digit non-zero.
static PINCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("Invalid pincode regex"));

/// Ten digits starting with 6-9.
static MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[6-9]\d{9}$").expect("Invalid mobile regex"));

/// Whether `pincode` is a valid 6-digit Indian postal code.
#[must_use]
pub fn validate_pincode(pincode: &str) -> bool {
    PINCODE_RE.is_match(pincode)
}

/// Whether `mobile` is a valid 10-digit Indian mobile number.
///
/// The number must be given without country code or separators.
#[must_use]
pub fn validate_mobile_number(mobile: &str) -> bool {
    MOBILE_RE.is_match(mobile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pincode() {
        assert!(validate_pincode("110001"));
        assert!(validate_pincode("847301"));
        assert!(!validate_pincode("012345"));
        assert!(!validate_pincode("11000"));
        assert!(!validate_pincode("1100011"));
        assert!(!validate_pincode("11000a"));
        assert!(!validate_pincode(" 110001"));
    }

    #[test]
    fn test_mobile_number() {
        assert!(validate_mobile_number("9876543210"));
        assert!(validate_mobile_number("6000000000"));
        assert!(!validate_mobile_number("1234567890"));
        assert!(!validate_mobile_number("5876543210"));
        assert!(!validate_mobile_number("987654321"));
        assert!(!validate_mobile_number("+919876543210"));
    }
}
