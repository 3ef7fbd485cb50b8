//! Contact form handler.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use hey_harvest_core::validation::validate_mobile_number;
use hey_harvest_core::{ContactMessageId, Email};

use super::{ApiJson, ApiResponse};
use crate::db::contact::{ContactRepository, NewContactMessage};
use crate::error::{AppError, Result};
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 100;
const MAX_SUBJECT_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 5_000;

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactReceipt {
    pub id: ContactMessageId,
}

/// A contact form after trimming and validation.
#[derive(Debug, PartialEq, Eq)]
struct CleanForm {
    name: String,
    email: Email,
    phone: Option<String>,
    subject: String,
    message: String,
}

fn clean(form: &ContactForm) -> Result<CleanForm> {
    let name = form.name.trim();
    let message = form.message.trim();
    if name.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest(
            "Name and message are required".to_string(),
        ));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::BadRequest("Name is too long".to_string()));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::BadRequest("Message is too long".to_string()));
    }

    let email = Email::parse(&form.email)
        .map_err(|_| AppError::BadRequest("Please enter a valid email address".to_string()))?;

    let phone = form
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());
    if phone.is_some_and(|p| !validate_mobile_number(p)) {
        return Err(AppError::BadRequest(
            "Please enter a valid 10-digit mobile number".to_string(),
        ));
    }

    let subject = form
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("General enquiry");
    if subject.chars().count() > MAX_SUBJECT_CHARS {
        return Err(AppError::BadRequest("Subject is too long".to_string()));
    }

    Ok(CleanForm {
        name: name.to_string(),
        email,
        phone: phone.map(str::to_string),
        subject: subject.to_string(),
        message: message.to_string(),
    })
}

#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ContactForm>,
) -> Result<(StatusCode, Json<ApiResponse<ContactReceipt>>)> {
    let form = clean(&form)?;

    let saved = ContactRepository::new(state.pool())
        .create(NewContactMessage {
            name: &form.name,
            email: form.email.as_ref(),
            phone: form.phone.as_deref(),
            subject: &form.subject,
            message: &form.message,
        })
        .await?;
    tracing::info!(message_id = %saved.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "Thanks for reaching out, we will get back to you soon",
            ContactReceipt { id: saved.id },
        ),
    ))
}
