//! Customer email addresses.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    #[error("email cannot be empty")]
    Empty,
    #[error("email must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email must contain an @ symbol")]
    MissingAtSymbol,
    #[error("email needs text before the @")]
    EmptyLocalPart,
    #[error("email needs a domain after the @")]
    EmptyDomain,
    #[error("email domain must contain a dot")]
    MissingTld,
}

/// A trimmed, lowercased email address.
///
/// Accounts and newsletter subscribers are keyed on this value, so
/// `Asha@Example.com` and `asha@example.com` are the same customer.
///
/// ```
/// use hey_harvest_core::Email;
///
/// let email = Email::parse("  Asha@Example.COM ").unwrap();
/// assert_eq!(email.as_str(), "asha@example.com");
/// assert!(Email::parse("asha@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Normalize and check `raw`.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] naming the first rule the trimmed input breaks.
    pub fn parse(raw: &str) -> Result<Self, EmailError> {
        let candidate = raw.trim();
        if candidate.is_empty() {
            return Err(EmailError::Empty);
        }
        if candidate.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let Some((local, domain)) = candidate.rsplit_once('@') else {
            return Err(EmailError::MissingAtSymbol);
        };
        match (local.is_empty(), domain.is_empty()) {
            (true, _) => Err(EmailError::EmptyLocalPart),
            (_, true) => Err(EmailError::EmptyDomain),
            _ if !has_tld(domain) => Err(EmailError::MissingTld),
            _ => Ok(Self(candidate.to_lowercase())),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn has_tld(domain: &str) -> bool {
    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_shapes() {
        for ok in [
            "asha@example.com",
            "asha.rao+orders@example.com",
            "ops@mail.heyharvest.in",
            "a@b.co",
        ] {
            assert!(Email::parse(ok).is_ok(), "{ok}");
        }
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = Email::parse("  Priya.Sharma@HeyHarvest.IN\n").unwrap();
        assert_eq!(email.as_str(), "priya.sharma@heyharvest.in");
        assert_eq!(email, "priya.sharma@heyharvest.in".parse().unwrap());
    }

    #[test]
    fn reports_the_broken_rule() {
        let cases = [
            ("", EmailError::Empty),
            ("   ", EmailError::Empty),
            ("no-at-symbol", EmailError::MissingAtSymbol),
            ("@heyharvest.in", EmailError::EmptyLocalPart),
            ("priya@", EmailError::EmptyDomain),
            ("priya@localhost", EmailError::MissingTld),
            ("priya@heyharvest.", EmailError::MissingTld),
            ("priya@.in", EmailError::MissingTld),
        ];
        for (input, expected) in cases {
            assert_eq!(Email::parse(input).unwrap_err(), expected, "{input:?}");
        }
    }

    #[test]
    fn rejects_overlong_addresses() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            Email::parse(&long).unwrap_err(),
            EmailError::TooLong { max: 254 }
        );
    }

    #[test]
    fn serializes_as_plain_string() {
        let email = Email::parse("asha@example.com").unwrap();
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"asha@example.com\"");
        assert_eq!(email.to_string(), "asha@example.com");
    }
}
