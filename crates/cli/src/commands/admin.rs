//! Admin account commands.
//!
//! # Usage
//!
//! ```bash
//! hh-cli admin create -e admin@heyharvest.in -n "Store Admin" -p 'long-random-password'
//! hh-cli admin promote -e ops@heyharvest.in
//! ```

use thiserror::Error;

use hey_harvest_core::{Email, UserId, UserRole};
use hey_harvest_storefront::db::{RepositoryError, UserRepository};
use hey_harvest_storefront::services::auth::{AuthError, AuthService, Registration};

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Validation or storage failure while creating the account.
    #[error("Could not create admin: {0}")]
    Create(#[from] AuthError),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("No account with email: {0}")]
    UnknownUser(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a new admin account with a password.
///
/// # Returns
///
/// The ID of the created user.
pub async fn create(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let pool = connect().await?;

    tracing::info!("Creating admin account: {}", email);
    let user = AuthService::new(&pool)
        .create_account(
            Registration {
                email,
                password,
                name,
                phone: None,
            },
            UserRole::Admin,
        )
        .await?;

    tracing::info!(
        "Admin account created! ID: {}, Email: {}",
        user.id,
        user.email
    );

    Ok(user.id)
}

/// Give an existing account the admin role.
pub async fn promote(email: &str) -> Result<(), AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    let pool = connect().await?;
    let users = UserRepository::new(&pool);

    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_string()))?;

    if user.role == UserRole::Admin {
        tracing::warn!("{} is already an admin", email);
        return Ok(());
    }

    users.set_role(user.id, UserRole::Admin).await?;
    tracing::info!("{} is now an admin", email);

    Ok(())
}
