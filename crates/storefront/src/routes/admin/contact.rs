//! Contact inbox.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::ContactMessageId;
use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};

use crate::db::contact::ContactRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::ContactMessage;
use crate::routes::{ApiPath, ApiQuery, ApiResponse, page_request};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{id}/resolve", put(resolve))
}

#[derive(Debug, Deserialize)]
pub struct ContactQuery {
    pub resolved: Option<bool>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Messages, unresolved first.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<ContactQuery>,
) -> Result<Json<ApiResponse<Paginated<ContactMessage>>>> {
    let messages = ContactRepository::new(state.pool())
        .list(
            query.resolved,
            page_request(query.page, query.limit, DEFAULT_LIMIT),
        )
        .await?;
    Ok(ApiResponse::ok(messages))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn resolve(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<ContactMessageId>,
) -> Result<Json<ApiResponse<ContactMessage>>> {
    let message = ContactRepository::new(state.pool()).resolve(id).await?;
    Ok(ApiResponse::with_message("Marked as resolved", message))
}
