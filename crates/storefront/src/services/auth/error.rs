use thiserror::Error;

use crate::db::RepositoryError;

/// Failures from registration, login and profile updates.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] hey_harvest_core::EmailError),

    /// Unknown email and wrong password are deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user not found")]
    UserNotFound,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("invalid profile: {0}")]
    InvalidProfile(&'static str),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("password hashing failed")]
    PasswordHash,
}
