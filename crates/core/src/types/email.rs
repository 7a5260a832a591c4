//! Email address type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input string is empty.
    #[error("email cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input does not contain exactly one @ symbol.
    #[error("email must contain exactly one @ symbol")]
    InvalidAtSymbol,
    /// The local part (before @) is empty.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// The domain part (after @) is empty or has no dot.
    #[error("email domain is invalid")]
    InvalidDomain,
    /// The address contains whitespace.
    #[error("email cannot contain whitespace")]
    Whitespace,
}

/// A normalized email address.
///
/// Emails are the login identifier, so they are trimmed and lower-cased on
/// parse. Two spellings of the same mailbox compare equal.
///
/// ## Constraints
///
/// - Length: 1-254 characters (RFC 5321 limit)
/// - Exactly one @ symbol, no inner whitespace
/// - Non-empty local part; domain contains a dot that is not at either end
///
/// ## Examples
///
/// ```
/// use ramen_map_core::Email;
///
/// let email = Email::parse("  Taro@Example.JP ").unwrap();
/// assert_eq!(email.as_str(), "taro@example.jp");
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("no-at-symbol").is_err());
/// assert!(Email::parse("user@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and normalize an `Email` from a string.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let mut parts = s.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(EmailError::InvalidAtSymbol);
        };

        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.starts_with('.') || domain.ends_with('.') || !domain.contains('.') {
            return Err(EmailError::InvalidDomain);
        }

        Ok(Self(s.to_lowercase()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Email` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns the local part of the email (before the @).
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or("")
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split('@').nth(1).unwrap_or("")
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = EmailError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Email {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Email {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        // Stored values were normalized on the way in
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Email {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_case_and_whitespace() {
        let email = Email::parse("  Hanako.Yamada@Example.co.JP\n").unwrap();
        assert_eq!(email.as_str(), "hanako.yamada@example.co.jp");
        assert_eq!(email, Email::parse("hanako.yamada@example.co.jp").unwrap());
    }

    #[test]
    fn test_parse_rejects_bad_shapes() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("a@b@c.jp"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("plain"), Err(EmailError::InvalidAtSymbol));
        assert_eq!(Email::parse("@ramen.jp"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("user@ramen"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("user@.jp"), Err(EmailError::InvalidDomain));
        assert_eq!(Email::parse("us er@ramen.jp"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(
            Email::parse(&long),
            Err(EmailError::TooLong { .. })
        ));
    }

    #[test]
    fn test_parts() {
        let email = Email::parse("ramen@shop.example").unwrap();
        assert_eq!(email.local_part(), "ramen");
        assert_eq!(email.domain(), "shop.example");
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: Email = serde_json::from_str("\"Chef@Ramen.jp\"").unwrap();
        assert_eq!(parsed.as_str(), "chef@ramen.jp");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }
}
