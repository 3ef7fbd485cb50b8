//! What the session cookie resolves to.

use serde::{Deserialize, Serialize};

use hey_harvest_core::{Email, UserId, UserRole};

/// The logged-in shopper or admin, as written at login.
///
/// Profile edits rewrite this entry so `name` stays current without a
/// database read per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

pub mod keys {
    pub const CURRENT_USER: &str = "current_user";
}
