//! Blog authoring.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use hey_harvest_core::BlogPostId;
use hey_harvest_core::pagination::{DEFAULT_LIMIT, Paginated};

use crate::db::blog::{BlogPostInput, BlogRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::{BlogPost, BlogPostSummary};
use crate::routes::{ApiJson, ApiPath, ApiQuery, ApiResponse, non_blank, page_request};
use crate::state::AppState;

const MAX_SLUG_CHARS: usize = 120;
const MAX_TAGS: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index).post(create))
        .route("/{id}", get(show).put(update).delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct BlogListQuery {
    pub tag: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostRequest {
    #[serde(default)]
    pub slug: Option<String>,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub body: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_published: bool,
}

/// Lowercase ASCII words joined by single hyphens.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.chars().take(MAX_SLUG_CHARS).collect()
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_SLUG_CHARS
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl BlogPostRequest {
    fn into_input(self) -> Result<BlogPostInput> {
        let title = self.title.trim();
        if title.is_empty() || self.body.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Title and body are required".to_string(),
            ));
        }

        let slug = non_blank(self.slug).unwrap_or_else(|| slugify(title));
        if !is_valid_slug(&slug) {
            return Err(AppError::BadRequest(
                "Slug may only contain lowercase letters, digits and hyphens".to_string(),
            ));
        }

        let mut tags: Vec<String> = Vec::new();
        for tag in self.tags.iter().map(|t| t.trim().to_lowercase()) {
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.len() > MAX_TAGS {
            return Err(AppError::BadRequest(format!(
                "At most {MAX_TAGS} tags are allowed"
            )));
        }

        Ok(BlogPostInput {
            slug,
            title: title.to_string(),
            excerpt: self.excerpt.trim().to_string(),
            body: self.body,
            cover_image: non_blank(self.cover_image),
            author: non_blank(self.author).unwrap_or_else(|| "Hey Harvest".to_string()),
            tags,
            is_published: self.is_published,
        })
    }
}

/// All posts, drafts included.
#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> Result<Json<ApiResponse<Paginated<BlogPostSummary>>>> {
    let tag = non_blank(query.tag);
    let posts = BlogRepository::new(state.pool())
        .list(
            false,
            tag.as_deref(),
            page_request(query.page, query.limit, DEFAULT_LIMIT),
        )
        .await?;
    Ok(ApiResponse::ok(posts))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BlogPostId>,
) -> Result<Json<ApiResponse<BlogPost>>> {
    let post = BlogRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
    Ok(ApiResponse::ok(post))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<BlogPostRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BlogPost>>)> {
    let input = body.into_input()?;
    let post = BlogRepository::new(state.pool()).create(&input).await?;
    tracing::info!(post_id = %post.id, slug = %post.slug, "Blog post created");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Post created", post),
    ))
}

#[instrument(skip(state, admin, body), fields(admin_id = %admin.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BlogPostId>,
    ApiJson(body): ApiJson<BlogPostRequest>,
) -> Result<Json<ApiResponse<BlogPost>>> {
    let input = body.into_input()?;
    let post = BlogRepository::new(state.pool()).update(id, &input).await?;
    Ok(ApiResponse::with_message("Post updated", post))
}

#[instrument(skip(state, admin), fields(admin_id = %admin.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<BlogPostId>,
) -> Result<Json<ApiResponse<()>>> {
    BlogRepository::new(state.pool()).delete(id).await?;
    tracing::info!(post_id = %id, "Blog post deleted");
    Ok(ApiResponse::with_message("Post deleted", ()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Why Makhana?  5 Reasons!"), "why-makhana-5-reasons");
        assert_eq!(slugify("--Roasted & Salted--"), "roasted-salted");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_into_input_derives_slug_and_author() {
        let body: BlogPostRequest = serde_json::from_value(serde_json::json!({
            "title": "Makhana for Breakfast",
            "body": "# Start your day",
            "tags": ["Recipes", " recipes ", ""]
        }))
        .unwrap();
        let input = body.into_input().unwrap();
        assert_eq!(input.slug, "makhana-for-breakfast");
        assert_eq!(input.author, "Hey Harvest");
        assert_eq!(input.tags, vec!["recipes".to_string()]);
        assert!(!input.is_published);
    }

    #[test]
    fn test_into_input_rejects_bad_slug() {
        let body: BlogPostRequest = serde_json::from_value(serde_json::json!({
            "slug": "Not A Slug",
            "title": "Title",
            "body": "Body"
        }))
        .unwrap();
        assert!(body.into_input().is_err());
    }
}
