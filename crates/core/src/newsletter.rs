//! Newsletter subscription rules.
//!
//! There is at most one subscription per email. Subscribing again after an
//! unsubscribe reactivates the existing record instead of inserting a new one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ParseStatusError;

/// Errors from subscription operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NewsletterError {
    #[error("already subscribed")]
    AlreadySubscribed,

    #[error("subscription not found")]
    NotSubscribed,
}

/// Topics a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub new_products: bool,
    pub offers: bool,
    pub recipes: bool,
    pub health_tips: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            new_products: true,
            offers: true,
            recipes: true,
            health_tips: true,
        }
    }
}

impl Preferences {
    /// Shallow-merge the flags present in `patch`.
    #[must_use]
    pub fn merge(self, patch: &PreferencesPatch) -> Self {
        Self {
            new_products: patch.new_products.unwrap_or(self.new_products),
            offers: patch.offers.unwrap_or(self.offers),
            recipes: patch.recipes.unwrap_or(self.recipes),
            health_tips: patch.health_tips.unwrap_or(self.health_tips),
        }
    }
}

/// A partial preferences update; absent flags are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub new_products: Option<bool>,
    pub offers: Option<bool>,
    pub recipes: Option<bool>,
    pub health_tips: Option<bool>,
}

/// Where on the site the subscription form was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionSource {
    #[default]
    Website,
    Footer,
    Popup,
    Checkout,
}

impl SubscriptionSource {
    /// Stored/serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Footer => "footer",
            Self::Popup => "popup",
            Self::Checkout => "checkout",
        }
    }
}

impl std::fmt::Display for SubscriptionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionSource {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "website" => Ok(Self::Website),
            "footer" => Ok(Self::Footer),
            "popup" => Ok(Self::Popup),
            "checkout" => Ok(Self::Checkout),
            _ => Err(ParseStatusError {
                kind: "subscription source",
                value: s.to_owned(),
            }),
        }
    }
}

/// The stored state of an email that matters for a new subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExistingSubscription {
    pub is_active: bool,
    pub preferences: Preferences,
}

/// What the repository should do for a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeAction {
    /// Insert a new record with these preferences.
    Create(Preferences),
    /// Reactivate the existing record in place with these preferences.
    Reactivate(Preferences),
}

impl SubscribeAction {
    /// Preferences to persist.
    #[must_use]
    pub const fn preferences(self) -> Preferences {
        match self {
            Self::Create(prefs) | Self::Reactivate(prefs) => prefs,
        }
    }
}

/// Decide how to handle a subscribe request.
///
/// # Errors
///
/// Returns `NewsletterError::AlreadySubscribed` if the email has an active
/// subscription.
pub fn plan_subscribe(
    existing: Option<ExistingSubscription>,
    patch: &PreferencesPatch,
) -> Result<SubscribeAction, NewsletterError> {
    match existing {
        Some(sub) if sub.is_active => Err(NewsletterError::AlreadySubscribed),
        Some(sub) => Ok(SubscribeAction::Reactivate(sub.preferences.merge(patch))),
        None => Ok(SubscribeAction::Create(Preferences::default().merge(patch))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscription_defaults_all_true() {
        let action = plan_subscribe(None, &PreferencesPatch::default()).unwrap();
        assert_eq!(action, SubscribeAction::Create(Preferences::default()));
        let prefs = action.preferences();
        assert!(prefs.new_products && prefs.offers && prefs.recipes && prefs.health_tips);
    }

    #[test]
    fn test_second_subscribe_while_active_rejected() {
        let existing = ExistingSubscription {
            is_active: true,
            preferences: Preferences::default(),
        };
        let err = plan_subscribe(Some(existing), &PreferencesPatch::default()).unwrap_err();
        assert_eq!(err, NewsletterError::AlreadySubscribed);
        assert_eq!(err.to_string(), "already subscribed");
    }

    #[test]
    fn test_resubscribe_reactivates_and_merges() {
        let existing = ExistingSubscription {
            is_active: false,
            preferences: Preferences {
                offers: false,
                ..Preferences::default()
            },
        };
        let patch = PreferencesPatch {
            recipes: Some(false),
            ..PreferencesPatch::default()
        };
        let action = plan_subscribe(Some(existing), &patch).unwrap();
        let SubscribeAction::Reactivate(prefs) = action else {
            panic!("expected reactivation, got {action:?}");
        };
        assert!(!prefs.offers);
        assert!(!prefs.recipes);
        assert!(prefs.new_products);
    }

    #[test]
    fn test_preferences_json_shape() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["newProducts"], true);
        assert_eq!(json["healthTips"], true);

        let patch: PreferencesPatch = serde_json::from_str(r#"{"offers":false}"#).unwrap();
        assert_eq!(patch.offers, Some(false));
        assert_eq!(patch.recipes, None);
    }

    #[test]
    fn test_source_parse() {
        assert_eq!("Popup".parse::<SubscriptionSource>().unwrap(), SubscriptionSource::Popup);
        assert_eq!(SubscriptionSource::default(), SubscriptionSource::Website);
        assert!("instagram".parse::<SubscriptionSource>().is_err());
    }
}
