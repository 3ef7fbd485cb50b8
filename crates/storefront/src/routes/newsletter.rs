//! Newsletter subscription handlers.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::newsletter::{PreferencesPatch, SubscriptionSource};
use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};

use super::{ApiJson, ApiQuery, ApiResponse, non_blank, page_request};
use crate::db::newsletter::{
    NewsletterRepository, SubscriberCounts, SubscriberFilter, SubscriberSort,
};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::Subscription;
use crate::services::newsletter::{NewsletterService, SubscribeRequest};
use crate::state::AppState;

/// `subscribe` is mounted with the strict limiter in [`super::routes`].
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/unsubscribe", post(unsubscribe))
        .route("/preferences", put(update_preferences))
        .route("/status", get(status))
        .route("/admin/subscribers", get(subscribers))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeBody {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: PreferencesPatch,
    #[serde(default)]
    pub source: Option<SubscriptionSource>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeBody {
    pub email: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreferencesBody {
    pub email: String,
    pub preferences: PreferencesPatch,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub email: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberQuery {
    pub is_active: Option<bool>,
    pub source: Option<SubscriptionSource>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SubscriberSort,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberList {
    #[serde(flatten)]
    pub subscribers: Paginated<Subscription>,
    pub counts: SubscriberCounts,
}

#[instrument(skip(state, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SubscribeBody>,
) -> Result<(StatusCode, Json<ApiResponse<Subscription>>)> {
    let subscription = NewsletterService::new(state.pool())
        .subscribe(SubscribeRequest {
            email: &body.email,
            first_name: body.first_name.as_deref(),
            last_name: body.last_name.as_deref(),
            phone: body.phone.as_deref(),
            preferences: body.preferences,
            source: body.source,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Successfully subscribed to newsletter", subscription),
    ))
}

#[instrument(skip(state, body))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UnsubscribeBody>,
) -> Result<Json<ApiResponse<Subscription>>> {
    let subscription = NewsletterService::new(state.pool())
        .unsubscribe(&body.email, body.reason.as_deref())
        .await?;
    Ok(ApiResponse::with_message(
        "Successfully unsubscribed from newsletter",
        subscription,
    ))
}

#[instrument(skip(state, body))]
pub async fn update_preferences(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PreferencesBody>,
) -> Result<Json<ApiResponse<Subscription>>> {
    let subscription = NewsletterService::new(state.pool())
        .update_preferences(&body.email, &body.preferences)
        .await?;
    Ok(ApiResponse::with_message("Preferences updated", subscription))
}

#[instrument(skip(state, query))]
pub async fn status(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StatusQuery>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>> {
    let email = non_blank(query.email)
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;
    let is_subscribed = NewsletterService::new(state.pool())
        .is_subscribed(&email)
        .await?;
    Ok(ApiResponse::ok(SubscriptionStatus {
        email,
        is_subscribed,
    }))
}

/// Back-office subscriber list with active/inactive totals.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn subscribers(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<SubscriberQuery>,
) -> Result<Json<ApiResponse<SubscriberList>>> {
    let filter = SubscriberFilter {
        is_active: query.is_active,
        source: query.source,
        search: non_blank(query.search),
    };
    let repo = NewsletterRepository::new(state.pool());
    let subscribers = repo
        .list(&filter, query.sort, page_request(query.page, query.limit, DEFAULT_LIMIT))
        .await?;
    let counts = repo.counts().await?;

    Ok(ApiResponse::ok(SubscriberList {
        subscribers,
        counts,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_body_defaults() {
        let body: SubscribeBody =
            serde_json::from_str(r#"{"email": "asha@example.com"}"#).unwrap();
        assert!(body.source.is_none());
        assert_eq!(body.preferences, PreferencesPatch::default());
    }

    #[test]
    fn test_subscribe_body_partial_preferences() {
        let body: SubscribeBody = serde_json::from_str(
            r#"{"email": "asha@example.com", "source": "popup", "preferences": {"recipes": false}}"#,
        )
        .unwrap();
        assert_eq!(body.source, Some(SubscriptionSource::Popup));
        assert_eq!(body.preferences.recipes, Some(false));
        assert_eq!(body.preferences.offers, None);
    }
}
