//! Blog post repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use hey_harvest_core::BlogPostId;
use hey_harvest_core::pagination::{PageRequest, Paginated};

use super::{RepositoryError, count};
use crate::models::{BlogPost, BlogPostSummary};
use crate::services::markdown::render_markdown;

const POST_COLUMNS: &str = "id, slug, title, excerpt, body, cover_image, author, tags, \
    is_published, published_at, created_at, updated_at";

const SUMMARY_COLUMNS: &str =
    "id, slug, title, excerpt, cover_image, author, tags, is_published, published_at";

#[derive(Debug, FromRow)]
struct PostRow {
    id: BlogPostId,
    slug: String,
    title: String,
    excerpt: String,
    body: String,
    cover_image: Option<String>,
    author: String,
    tags: Vec<String>,
    is_published: bool,
    published_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PostRow> for BlogPost {
    fn from(row: PostRow) -> Self {
        Self {
            html: render_markdown(&row.body),
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            body: row.body,
            cover_image: row.cover_image,
            author: row.author,
            tags: row.tags,
            is_published: row.is_published,
            published_at: row.published_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    id: BlogPostId,
    slug: String,
    title: String,
    excerpt: String,
    cover_image: Option<String>,
    author: String,
    tags: Vec<String>,
    is_published: bool,
    published_at: Option<DateTime<Utc>>,
}

impl From<SummaryRow> for BlogPostSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            title: row.title,
            excerpt: row.excerpt,
            cover_image: row.cover_image,
            author: row.author,
            tags: row.tags,
            is_published: row.is_published,
            published_at: row.published_at,
        }
    }
}

/// Editable blog post fields.
#[derive(Debug, Clone)]
pub struct BlogPostInput {
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub cover_image: Option<String>,
    pub author: String,
    pub tags: Vec<String>,
    pub is_published: bool,
}

/// Repository for blog posts.
pub struct BlogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BlogRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Page through posts, newest first. `published_only` hides drafts;
    /// `tag` filters on an exact tag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        published_only: bool,
        tag: Option<&str>,
        page: PageRequest,
    ) -> Result<Paginated<BlogPostSummary>, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*) FROM storefront.blog_post
            WHERE (NOT $1 OR is_published) AND ($2::TEXT IS NULL OR $2 = ANY(tags))
            ",
        )
        .bind(published_only)
        .bind(tag)
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r"
            SELECT {SUMMARY_COLUMNS}
            FROM storefront.blog_post
            WHERE (NOT $1 OR is_published) AND ($2::TEXT IS NULL OR $2 = ANY(tags))
            ORDER BY COALESCE(published_at, created_at) DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(published_only)
        .bind(tag)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows.into_iter().map(BlogPostSummary::from).collect();
        Ok(Paginated::new(items, page, count(total)))
    }

    /// Get a published post by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_published(&self, slug: &str) -> Result<Option<BlogPost>, RepositoryError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM storefront.blog_post WHERE slug = $1 AND is_published"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(BlogPost::from))
    }

    /// Get any post by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BlogPostId) -> Result<Option<BlogPost>, RepositoryError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM storefront.blog_post WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(BlogPost::from))
    }

    /// Create a post. Publishing stamps `published_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &BlogPostInput) -> Result<BlogPost, RepositoryError> {
        let row: PostRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.blog_post
                (slug, title, excerpt, body, cover_image, author, tags, is_published, published_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $8 THEN NOW() END)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.excerpt)
        .bind(&input.body)
        .bind(&input.cover_image)
        .bind(&input.author)
        .bind(&input.tags)
        .bind(input.is_published)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))?;

        Ok(BlogPost::from(row))
    }

    /// Replace a post's fields. The first publish stamps `published_at`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is taken.
    pub async fn update(
        &self,
        id: BlogPostId,
        input: &BlogPostInput,
    ) -> Result<BlogPost, RepositoryError> {
        let row: Option<PostRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.blog_post
            SET slug = $2, title = $3, excerpt = $4, body = $5, cover_image = $6, author = $7,
                tags = $8, is_published = $9,
                published_at = CASE WHEN $9 THEN COALESCE(published_at, NOW()) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.excerpt)
        .bind(&input.body)
        .bind(&input.cover_image)
        .bind(&input.author)
        .bind(&input.tags)
        .bind(input.is_published)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::unique_violation(e, "slug already exists"))?;

        row.map(BlogPost::from).ok_or(RepositoryError::NotFound)
    }

    /// Delete a post.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the post doesn't exist.
    pub async fn delete(&self, id: BlogPostId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.blog_post WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
