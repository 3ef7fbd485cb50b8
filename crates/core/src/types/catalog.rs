//! Catalog enums: product category and pack size.
//!
//! Both are stored by key (`pure_4_suta`, `12_16mm`) and displayed by label
//! (`Pure 4 Suta`, `12-16mm`). Parsing accepts either form.

use serde::{Deserialize, Serialize};

use super::status::ParseStatusError;

/// Makhana product line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    #[serde(rename = "pure_4_suta")]
    Pure4Suta,
    #[serde(rename = "pure_5_suta")]
    Pure5Suta,
    #[serde(rename = "pure_6_suta")]
    Pure6Suta,
    FlavouredMakhana,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [
        Self::Pure4Suta,
        Self::Pure5Suta,
        Self::Pure6Suta,
        Self::FlavouredMakhana,
    ];

    /// Stored/serialized key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Pure4Suta => "pure_4_suta",
            Self::Pure5Suta => "pure_5_suta",
            Self::Pure6Suta => "pure_6_suta",
            Self::FlavouredMakhana => "flavoured_makhana",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pure4Suta => "Pure 4 Suta",
            Self::Pure5Suta => "Pure 5 Suta",
            Self::Pure6Suta => "Pure 6 Suta",
            Self::FlavouredMakhana => "Flavoured Makhana",
        }
    }

    /// Code used as the first SKU segment.
    #[must_use]
    pub const fn sku_code(self) -> &'static str {
        match self {
            Self::Pure4Suta => "P4S",
            Self::Pure5Suta => "P5S",
            Self::Pure6Suta => "P6S",
            Self::FlavouredMakhana => "FLV",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Category {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s) || c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStatusError {
                kind: "category",
                value: s.to_owned(),
            })
    }
}

/// Makhana grade by popped-seed diameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "12_16mm")]
    Mm12To16,
    #[serde(rename = "16_20mm")]
    Mm16To20,
    #[serde(rename = "20_24mm")]
    Mm20To24,
}

impl Size {
    /// All sizes, smallest first.
    pub const ALL: [Self; 3] = [Self::Mm12To16, Self::Mm16To20, Self::Mm20To24];

    /// Stored/serialized key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Mm12To16 => "12_16mm",
            Self::Mm16To20 => "16_20mm",
            Self::Mm20To24 => "20_24mm",
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mm12To16 => "12-16mm",
            Self::Mm16To20 => "16-20mm",
            Self::Mm20To24 => "20-24mm",
        }
    }

    /// Code used as the second SKU segment.
    #[must_use]
    pub const fn sku_code(self) -> &'static str {
        match self {
            Self::Mm12To16 => "1216",
            Self::Mm16To20 => "1620",
            Self::Mm20To24 => "2024",
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Size {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|size| size.key().eq_ignore_ascii_case(s) || size.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStatusError {
                kind: "size",
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parses_key_and_label() {
        assert_eq!("Pure 4 Suta".parse::<Category>().unwrap(), Category::Pure4Suta);
        assert_eq!("pure_4_suta".parse::<Category>().unwrap(), Category::Pure4Suta);
        assert_eq!(
            "flavoured makhana".parse::<Category>().unwrap(),
            Category::FlavouredMakhana
        );
        assert!("Lotus Seeds".parse::<Category>().is_err());
    }

    #[test]
    fn test_size_parses_key_and_label() {
        assert_eq!("12-16mm".parse::<Size>().unwrap(), Size::Mm12To16);
        assert_eq!("20_24mm".parse::<Size>().unwrap(), Size::Mm20To24);
        assert!("200g".parse::<Size>().is_err());
    }

    #[test]
    fn test_serde_uses_keys() {
        assert_eq!(
            serde_json::to_string(&Category::Pure5Suta).unwrap(),
            "\"pure_5_suta\""
        );
        assert_eq!(serde_json::to_string(&Size::Mm16To20).unwrap(), "\"16_20mm\"");
    }
}
