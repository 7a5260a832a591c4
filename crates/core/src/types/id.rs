//! Typed row IDs.
//!
//! Every table uses a `SERIAL` key; wrapping each in its own type keeps a
//! `ShopId` from being passed where a `ReviewId` is expected.

/// Define an `i32`-backed ID newtype.
///
/// The generated type is `Copy`, serializes as a bare number, parses from a
/// path segment or CLI argument via `FromStr`, and with the `postgres`
/// feature binds as `INTEGER`.
///
/// ```rust
/// # use ramen_map_core::define_id;
/// define_id!(BowlId);
///
/// let id: BowlId = "42".parse().unwrap();
/// assert_eq!(id.as_i32(), 42);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type), sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ShopId);
define_id!(ReviewId);
define_id!(InviteCodeId);
define_id!(ImageId);
define_id!(ApiTokenId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = ShopId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let parsed: ShopId = serde_json::from_str("42").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_from_str() {
        let id: UserId = " 12 ".parse().unwrap();
        assert_eq!(id, UserId::new(12));
        assert!("abc".parse::<UserId>().is_err());
    }

    #[test]
    fn test_id_display_and_conversions() {
        let id = ReviewId::from(7);
        assert_eq!(id.to_string(), "7");
        assert_eq!(i32::from(id), 7);
        assert_eq!(id.as_i32(), 7);
    }

    #[test]
    fn test_ids_order_numerically() {
        assert!(ImageId::new(2) < ImageId::new(10));
    }
}
