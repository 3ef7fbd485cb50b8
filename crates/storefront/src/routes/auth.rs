//! Account route handlers: session login, profile and saved addresses.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use hey_harvest_core::{AddressId, AddressType};

use super::{ApiJson, ApiPath, ApiResponse};
use crate::db::addresses::AddressRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::{Address, AddressDetails, User};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Routes under `/api/auth` that use the general limiter.
///
/// `register` and `login` are mounted separately with the strict limiter.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
        .route("/addresses", get(list_addresses).post(create_address))
        .route(
            "/addresses/{id}",
            put(update_address).delete(delete_address),
        )
        .route("/addresses/{id}/default", put(set_default_address))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    #[serde(flatten)]
    pub details: AddressDetails,
    #[serde(default)]
    pub address_type: AddressType,
    #[serde(default)]
    pub is_default: bool,
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &user.to_current_user())
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Create an account and log it in.
#[instrument(skip(state, session, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>)> {
    let user = AuthService::new(state.pool())
        .register(Registration {
            email: &body.email,
            password: &body.password,
            name: &body.name,
            phone: body.phone.as_deref(),
        })
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Account registered");

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Account created", user),
    ))
}

/// Log in with email and password.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let user = AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await?;

    start_session(&session, &user).await?;
    tracing::info!(user_id = %user.id, "Logged in");

    Ok(ApiResponse::with_message("Logged in", user))
}

/// Destroy the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<ApiResponse<()>>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;
    clear_sentry_user();
    Ok(ApiResponse::with_message("Logged out", ()))
}

/// The logged-in user's profile.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<User>>> {
    let user = AuthService::new(state.pool()).get_user(user.id).await?;
    Ok(ApiResponse::ok(user))
}

/// Update name and phone; the session copy is refreshed too.
#[instrument(skip(state, session, current, body), fields(user_id = %current.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    ApiJson(body): ApiJson<ProfileRequest>,
) -> Result<Json<ApiResponse<User>>> {
    let user = AuthService::new(state.pool())
        .update_profile(current.id, &body.name, body.phone.as_deref())
        .await?;

    set_current_user(&session, &user.to_current_user())
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(ApiResponse::with_message("Profile updated", user))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_addresses(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ApiResponse<Vec<Address>>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.id).await?;
    Ok(ApiResponse::ok(addresses))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddressRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Address>>)> {
    body.details
        .validate()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let address = AddressRepository::new(state.pool())
        .create(user.id, &body.details, body.address_type, body.is_default)
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("Address saved", address),
    ))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
    ApiJson(body): ApiJson<AddressRequest>,
) -> Result<Json<ApiResponse<Address>>> {
    body.details
        .validate()
        .map_err(|msg| AppError::BadRequest(msg.to_string()))?;

    let repo = AddressRepository::new(state.pool());
    let mut address = repo
        .update(user.id, id, &body.details, body.address_type)
        .await?;

    if body.is_default && !address.is_default {
        repo.set_default(user.id, id).await?;
        address.is_default = true;
    }

    Ok(ApiResponse::with_message("Address updated", address))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<Json<ApiResponse<()>>> {
    AddressRepository::new(state.pool())
        .delete(user.id, id)
        .await?;
    Ok(ApiResponse::with_message("Address deleted", ()))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn set_default_address(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(id): ApiPath<AddressId>,
) -> Result<Json<ApiResponse<Vec<Address>>>> {
    let repo = AddressRepository::new(state.pool());
    repo.set_default(user.id, id).await?;
    Ok(ApiResponse::with_message(
        "Default address updated",
        repo.list(user.id).await?,
    ))
}
