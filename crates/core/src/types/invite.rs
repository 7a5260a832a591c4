//! Invite codes gating registration.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Characters used in codes. Excludes `0 O 1 I L` to avoid misreading.
pub const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
/// Length of every code.
pub const CODE_LENGTH: usize = 8;

/// An invite code string, upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InviteCode(String);

impl InviteCode {
    /// Generate a random code.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..CODE_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..ALPHABET.len());
                char::from(ALPHABET.get(idx).copied().unwrap_or(b'A'))
            })
            .collect();
        Self(code)
    }

    /// Normalize user input (trim, upper-case).
    ///
    /// Returns `None` when the input could never be a valid code.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        Self::is_well_formed(&code).then_some(Self(code))
    }

    /// Returns true if `code` has the right length and alphabet.
    #[must_use]
    pub fn is_well_formed(code: &str) -> bool {
        code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InviteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InviteCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_codes_are_well_formed() {
        let mut rng = rand::rng();
        for _ in 0..200 {
            let code = InviteCode::generate(&mut rng);
            assert!(InviteCode::is_well_formed(code.as_str()), "{code}");
        }
    }

    #[test]
    fn test_alphabet_excludes_ambiguous_characters() {
        for c in [b'0', b'O', b'1', b'I', b'L'] {
            assert!(!ALPHABET.contains(&c));
        }
    }

    #[test]
    fn test_parse_normalizes_input() {
        assert_eq!(
            InviteCode::parse(" abcd2345 ").map(|c| c.to_string()),
            Some("ABCD2345".to_owned())
        );
        assert!(InviteCode::parse("ABC").is_none());
        assert!(InviteCode::parse("ABCD234O").is_none());
    }
}
