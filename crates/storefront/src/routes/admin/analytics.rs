//! Dashboard metrics, cached for a minute.

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use tracing::instrument;

use crate::db::analytics::{AnalyticsRepository, Dashboard};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::ApiResponse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ApiResponse<Arc<Dashboard>>>> {
    let pool = state.pool().clone();
    let dashboard = state
        .dashboard_cache()
        .try_get_with((), async move {
            AnalyticsRepository::new(&pool).dashboard().await.map(Arc::new)
        })
        .await
        .map_err(|e| AppError::Internal(format!("dashboard query failed: {e}")))?;

    Ok(ApiResponse::ok(dashboard))
}
