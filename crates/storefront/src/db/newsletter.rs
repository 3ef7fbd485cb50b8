//! Newsletter subscription repository.
//!
//! Emails are stored lowercased (`Email` normalizes on parse), so lookups
//! are plain equality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use hey_harvest_core::newsletter::{Preferences, SubscriptionSource};
use hey_harvest_core::pagination::{PageRequest, Paginated};
use hey_harvest_core::{Email, SubscriptionId};

use super::products::escape_like;
use super::{RepositoryError, count, parse_column};
use crate::models::Subscription;

const SUBSCRIPTION_COLUMNS: &str = "id, email, first_name, last_name, phone, new_products, \
    offers, recipes, health_tips, source, is_active, unsubscribed_at, unsubscribe_reason, \
    created_at, updated_at";

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: SubscriptionId,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    new_products: bool,
    offers: bool,
    recipes: bool,
    health_tips: bool,
    source: String,
    is_active: bool,
    unsubscribed_at: Option<DateTime<Utc>>,
    unsubscribe_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = RepositoryError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            preferences: Preferences {
                new_products: row.new_products,
                offers: row.offers,
                recipes: row.recipes,
                health_tips: row.health_tips,
            },
            source: parse_column(&row.source, "source")?,
            is_active: row.is_active,
            unsubscribed_at: row.unsubscribed_at,
            unsubscribe_reason: row.unsubscribe_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Contact fields captured with a subscription.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriberDetails<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
}

/// Sort order for the subscriber list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SubscriberSort {
    #[default]
    #[serde(rename = "createdAt")]
    CreatedAt,
    #[serde(rename = "email")]
    Email,
}

/// Subscriber list filters.
#[derive(Debug, Clone, Default)]
pub struct SubscriberFilter {
    pub is_active: Option<bool>,
    pub source: Option<SubscriptionSource>,
    /// Substring of email or name.
    pub search: Option<String>,
}

impl SubscriberFilter {
    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" WHERE TRUE");

        if let Some(active) = self.is_active {
            qb.push(" AND is_active = ").push_bind(active);
        }
        if let Some(source) = self.source {
            qb.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            qb.push(" AND (email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR COALESCE(first_name, '') || ' ' || COALESCE(last_name, '') ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// Subscriber counts grouped by active flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberCounts {
    pub active: u64,
    pub inactive: u64,
}

/// Repository for newsletter subscriptions.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the subscription for an email, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Subscription>, RepositoryError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM storefront.newsletter_subscription WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    /// Insert a new subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already present.
    pub async fn create(
        &self,
        email: &Email,
        details: SubscriberDetails<'_>,
        preferences: Preferences,
        source: SubscriptionSource,
    ) -> Result<Subscription, RepositoryError> {
        let row: SubscriptionRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.newsletter_subscription
                (email, first_name, last_name, phone, new_products, offers, recipes,
                 health_tips, source)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(details.first_name)
        .bind(details.last_name)
        .bind(details.phone)
        .bind(preferences.new_products)
        .bind(preferences.offers)
        .bind(preferences.recipes)
        .bind(preferences.health_tips)
        .bind(source.as_str())
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "already subscribed"))?;

        Subscription::try_from(row)
    }

    /// Reactivate an inactive subscription in place.
    ///
    /// Supplied contact fields replace the stored ones; absent ones are kept.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no inactive subscription has this id.
    pub async fn reactivate(
        &self,
        id: SubscriptionId,
        details: SubscriberDetails<'_>,
        preferences: Preferences,
        source: SubscriptionSource,
    ) -> Result<Subscription, RepositoryError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.newsletter_subscription
            SET is_active = TRUE, unsubscribed_at = NULL, unsubscribe_reason = NULL,
                first_name = COALESCE($2, first_name), last_name = COALESCE($3, last_name),
                phone = COALESCE($4, phone), new_products = $5, offers = $6, recipes = $7,
                health_tips = $8, source = $9, updated_at = NOW()
            WHERE id = $1 AND NOT is_active
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(id)
        .bind(details.first_name)
        .bind(details.last_name)
        .bind(details.phone)
        .bind(preferences.new_products)
        .bind(preferences.offers)
        .bind(preferences.recipes)
        .bind(preferences.health_tips)
        .bind(source.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Subscription::try_from)
    }

    /// Deactivate the active subscription for an email.
    ///
    /// Returns `None` when there is no active subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(
        &self,
        email: &Email,
        reason: Option<&str>,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.newsletter_subscription
            SET is_active = FALSE, unsubscribed_at = NOW(), unsubscribe_reason = $2,
                updated_at = NOW()
            WHERE email = $1 AND is_active
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(reason)
        .fetch_optional(self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    /// Overwrite the preference flags of the active subscription for an email.
    ///
    /// Returns `None` when there is no active subscription.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_preferences(
        &self,
        email: &Email,
        preferences: Preferences,
    ) -> Result<Option<Subscription>, RepositoryError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.newsletter_subscription
            SET new_products = $2, offers = $3, recipes = $4, health_tips = $5,
                updated_at = NOW()
            WHERE email = $1 AND is_active
            RETURNING {SUBSCRIPTION_COLUMNS}
            "
        ))
        .bind(email.as_str())
        .bind(preferences.new_products)
        .bind(preferences.offers)
        .bind(preferences.recipes)
        .bind(preferences.health_tips)
        .fetch_optional(self.pool)
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    /// Page through subscribers.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &SubscriberFilter,
        sort: SubscriberSort,
        page: PageRequest,
    ) -> Result<Paginated<Subscription>, RepositoryError> {
        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM storefront.newsletter_subscription");
        filter.push_where(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(self.pool).await?;

        let mut qb = QueryBuilder::new(format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM storefront.newsletter_subscription"
        ));
        filter.push_where(&mut qb);
        qb.push(match sort {
            SubscriberSort::CreatedAt => " ORDER BY created_at DESC, id DESC",
            SubscriberSort::Email => " ORDER BY email ASC",
        });
        qb.push(" LIMIT ")
            .push_bind(page.sql_limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<SubscriptionRow> = qb.build_query_as().fetch_all(self.pool).await?;
        let items = rows
            .into_iter()
            .map(Subscription::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Paginated::new(items, page, count(total)))
    }

    /// Count subscribers grouped by active flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn counts(&self) -> Result<SubscriberCounts, RepositoryError> {
        let rows: Vec<(bool, i64)> = sqlx::query_as(
            "SELECT is_active, COUNT(*) FROM storefront.newsletter_subscription GROUP BY is_active",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .fold(SubscriberCounts::default(), |acc, (active, n)| {
                if active {
                    SubscriberCounts {
                        active: count(n),
                        ..acc
                    }
                } else {
                    SubscriberCounts {
                        inactive: count(n),
                        ..acc
                    }
                }
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_filter_sql() {
        let filter = SubscriberFilter {
            is_active: Some(false),
            source: Some(SubscriptionSource::Popup),
            search: Some("asha".to_string()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM t");
        filter.push_where(&mut qb);
        let sql = qb.into_sql();

        assert!(sql.contains("is_active = $1"));
        assert!(sql.contains("source = $2"));
        assert!(sql.contains("email ILIKE $3"));
    }

    #[test]
    fn test_sort_query_values() {
        let sort: SubscriberSort = serde_json::from_str("\"email\"").unwrap_or_default();
        assert_eq!(sort, SubscriberSort::Email);
        let sort: SubscriberSort = serde_json::from_str("\"createdAt\"").unwrap_or_default();
        assert_eq!(sort, SubscriberSort::CreatedAt);
    }
}
