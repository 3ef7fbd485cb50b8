//! Contact form inbox.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use hey_harvest_core::ContactMessageId;
use hey_harvest_core::pagination::{PageRequest, Paginated};

use super::{RepositoryError, count};
use crate::models::ContactMessage;

const MESSAGE_COLUMNS: &str =
    "id, name, email, phone, subject, message, is_resolved, created_at";

#[derive(Debug, FromRow)]
struct MessageRow {
    id: ContactMessageId,
    name: String,
    email: String,
    phone: Option<String>,
    subject: String,
    message: String,
    is_resolved: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for ContactMessage {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            subject: row.subject,
            message: row.message,
            is_resolved: row.is_resolved,
            created_at: row.created_at,
        }
    }
}

/// A submitted contact form.
#[derive(Debug, Clone, Copy)]
pub struct NewContactMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub subject: &'a str,
    pub message: &'a str,
}

pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        message: NewContactMessage<'_>,
    ) -> Result<ContactMessage, RepositoryError> {
        let row: MessageRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.contact_message (name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(message.name)
        .bind(message.email)
        .bind(message.phone)
        .bind(message.subject)
        .bind(message.message)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Page through messages, unresolved first then newest.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        resolved: Option<bool>,
        page: PageRequest,
    ) -> Result<Paginated<ContactMessage>, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM storefront.contact_message WHERE ($1::BOOL IS NULL OR is_resolved = $1)",
        )
        .bind(resolved)
        .fetch_one(self.pool)
        .await?;

        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r"
            SELECT {MESSAGE_COLUMNS}
            FROM storefront.contact_message
            WHERE ($1::BOOL IS NULL OR is_resolved = $1)
            ORDER BY is_resolved, created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(resolved)
        .bind(page.sql_limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let items = rows.into_iter().map(ContactMessage::from).collect();
        Ok(Paginated::new(items, page, count(total)))
    }

    /// Mark a message resolved.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the message doesn't exist.
    pub async fn resolve(&self, id: ContactMessageId) -> Result<ContactMessage, RepositoryError> {
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.contact_message SET is_resolved = TRUE
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(ContactMessage::from).ok_or(RepositoryError::NotFound)
    }
}
