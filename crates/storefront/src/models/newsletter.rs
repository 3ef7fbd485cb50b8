//! Newsletter subscription domain type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use hey_harvest_core::newsletter::{Preferences, SubscriptionSource};
use hey_harvest_core::{Email, SubscriptionId};

/// A newsletter subscription record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub preferences: Preferences,
    pub source: SubscriptionSource,
    pub is_active: bool,
    pub unsubscribed_at: Option<DateTime<Utc>>,
    pub unsubscribe_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
