//! Published blog posts.

use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};

use super::{ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::db::blog::BlogRepository;
use crate::error::{AppError, Result};
use crate::models::{BlogPost, BlogPostSummary};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/{slug}", get(show))
}

#[derive(Debug, Deserialize)]
pub struct BlogQuery {
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BlogQuery>,
) -> Result<Json<ApiResponse<Paginated<BlogPostSummary>>>> {
    let tag = non_blank(query.tag);
    let posts = BlogRepository::new(state.pool())
        .list(
            true,
            tag.as_deref(),
            page_request(query.page, query.limit, DEFAULT_LIMIT),
        )
        .await?;
    Ok(ApiResponse::ok(posts))
}

#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<ApiResponse<BlogPost>>> {
    let post = BlogRepository::new(state.pool())
        .get_published(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(ApiResponse::ok(post))
}
