//! Session-related types for user authentication.

use serde::{Deserialize, Serialize};

use ramen_map_core::{Email, UserId, UserRole};

use crate::db::User;

/// Session-stored user identity.
///
/// The role here reflects sign-in time; admin routes re-check it against the
/// database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
