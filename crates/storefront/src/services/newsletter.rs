//! Newsletter subscriptions.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use hey_harvest_core::newsletter::{
    ExistingSubscription, NewsletterError, PreferencesPatch, SubscribeAction, SubscriptionSource,
    plan_subscribe,
};
use hey_harvest_core::validation::validate_mobile_number;
use hey_harvest_core::{Email, EmailError};

use crate::db::RepositoryError;
use crate::db::newsletter::{NewsletterRepository, SubscriberDetails};
use crate::models::Subscription;

const MAX_NAME_CHARS: usize = 50;
const MAX_REASON_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("{0}")]
    InvalidField(&'static str),

    #[error(transparent)]
    Rule(#[from] NewsletterError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A subscribe request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscribeRequest<'a> {
    pub email: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub preferences: PreferencesPatch,
    pub source: Option<SubscriptionSource>,
}

pub struct NewsletterService<'a> {
    subscriptions: NewsletterRepository<'a>,
}

impl<'a> NewsletterService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            subscriptions: NewsletterRepository::new(pool),
        }
    }

    /// Subscribe an email, reactivating a previous subscription if one exists.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Rule(AlreadySubscribed)` for an active email.
    #[instrument(skip(self, request))]
    pub async fn subscribe(
        &self,
        request: SubscribeRequest<'_>,
    ) -> Result<Subscription, SubscriptionError> {
        let email = Email::parse(request.email)?;
        let details = SubscriberDetails {
            first_name: clean_name(request.first_name)?,
            last_name: clean_name(request.last_name)?,
            phone: clean_phone(request.phone)?,
        };
        let source = request.source.unwrap_or_default();

        let existing = self.subscriptions.find_by_email(&email).await?;
        let plan = plan_subscribe(
            existing.as_ref().map(|s| ExistingSubscription {
                is_active: s.is_active,
                preferences: s.preferences,
            }),
            &request.preferences,
        )?;

        let subscription = match (plan, existing) {
            (SubscribeAction::Reactivate(prefs), Some(previous)) => {
                tracing::info!(subscription_id = %previous.id, "Reactivating subscription");
                self.subscriptions
                    .reactivate(previous.id, details, prefs, source)
                    .await
                    .map_err(lost_subscribe_race)?
            }
            (action, _) => self
                .subscriptions
                .create(&email, details, action.preferences(), source)
                .await
                .map_err(lost_subscribe_race)?,
        };

        Ok(subscription)
    }

    /// Deactivate the active subscription for an email.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Rule(NotSubscribed)` if there is none.
    #[instrument(skip(self, email, reason))]
    pub async fn unsubscribe(
        &self,
        email: &str,
        reason: Option<&str>,
    ) -> Result<Subscription, SubscriptionError> {
        let email = Email::parse(email)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| r.chars().take(MAX_REASON_CHARS).collect::<String>());

        self.subscriptions
            .unsubscribe(&email, reason.as_deref())
            .await?
            .ok_or(SubscriptionError::Rule(NewsletterError::NotSubscribed))
    }

    /// Merge preference flags into the active subscription.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::Rule(NotSubscribed)` if there is none.
    #[instrument(skip(self, email))]
    pub async fn update_preferences(
        &self,
        email: &str,
        patch: &PreferencesPatch,
    ) -> Result<Subscription, SubscriptionError> {
        let email = Email::parse(email)?;

        let current = self
            .subscriptions
            .find_by_email(&email)
            .await?
            .filter(|s| s.is_active)
            .ok_or(SubscriptionError::Rule(NewsletterError::NotSubscribed))?;

        self.subscriptions
            .update_preferences(&email, current.preferences.merge(patch))
            .await?
            .ok_or(SubscriptionError::Rule(NewsletterError::NotSubscribed))
    }

    /// Whether an email is actively subscribed.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionError::InvalidEmail` for a malformed address.
    pub async fn is_subscribed(&self, email: &str) -> Result<bool, SubscriptionError> {
        let email = Email::parse(email)?;
        Ok(self
            .subscriptions
            .find_by_email(&email)
            .await?
            .is_some_and(|s| s.is_active))
    }
}

fn clean_name(name: Option<&str>) -> Result<Option<&str>, SubscriptionError> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) if n.chars().count() > MAX_NAME_CHARS => {
            Err(SubscriptionError::InvalidField("name is too long"))
        }
        other => Ok(other),
    }
}

fn clean_phone(phone: Option<&str>) -> Result<Option<&str>, SubscriptionError> {
    match phone.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) if !validate_mobile_number(p) => Err(SubscriptionError::InvalidField(
            "please enter a valid 10-digit mobile number",
        )),
        other => Ok(other),
    }
}

/// A concurrent subscribe for the same email got there first: the insert
/// hits the unique email, or the inactive row is already reactivated.
fn lost_subscribe_race(err: RepositoryError) -> SubscriptionError {
    match err {
        RepositoryError::Conflict(_) | RepositoryError::NotFound => {
            SubscriptionError::Rule(NewsletterError::AlreadySubscribed)
        }
        other => SubscriptionError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_losing_a_subscribe_race_reads_as_already_subscribed() {
        for err in [
            RepositoryError::NotFound,
            RepositoryError::Conflict("email already subscribed".to_owned()),
        ] {
            assert!(matches!(
                lost_subscribe_race(err),
                SubscriptionError::Rule(NewsletterError::AlreadySubscribed)
            ));
        }
        assert!(matches!(
            lost_subscribe_race(RepositoryError::DataCorruption("bad".to_owned())),
            SubscriptionError::Repository(_)
        ));
    }

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name(Some("  Ravi ")).unwrap(), Some("Ravi"));
        assert_eq!(clean_name(Some("")).unwrap(), None);
        assert!(clean_name(Some(&"a".repeat(51))).is_err());
    }

    #[test]
    fn test_clean_phone() {
        assert_eq!(clean_phone(None).unwrap(), None);
        assert_eq!(clean_phone(Some("9123456780")).unwrap(), Some("9123456780"));
        assert!(clean_phone(Some("0123456789")).is_err());
    }
}
