//! Role and classification enums.

use serde::{Deserialize, Serialize};

/// User role controlling access to the admin dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Can browse and manage their own reviews.
    #[default]
    Normal,
    /// Full access to the admin dashboard.
    Admin,
}

impl UserRole {
    /// Returns true for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Ok(Self::Normal),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

/// How a user signs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "auth_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Email and password.
    #[default]
    Email,
    /// Google account (imported profiles).
    Google,
}

/// How the visit was booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "reservation_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ReservationType {
    /// Walked in and queued.
    #[default]
    None,
    /// Booked a table in advance.
    Reservation,
    /// Held a numbered ticket (seiriken) handed out before opening.
    NumberedTicket,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_wire_format() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(
            serde_json::from_str::<UserRole>("\"NORMAL\"").unwrap(),
            UserRole::Normal
        );
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!(" NORMAL ".parse::<UserRole>().unwrap(), UserRole::Normal);
        assert!("owner".parse::<UserRole>().is_err());
        assert_eq!(UserRole::Admin.to_string(), "ADMIN");
    }

    #[test]
    fn test_reservation_wire_format() {
        assert_eq!(
            serde_json::to_string(&ReservationType::NumberedTicket).unwrap(),
            "\"numbered_ticket\""
        );
    }
}
