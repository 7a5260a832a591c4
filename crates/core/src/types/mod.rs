//! Core types for Ramen Map.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod invite;
pub mod price;
pub mod review;
pub mod role;
pub mod shop;

pub use email::{Email, EmailError};
pub use geo::{Bounds, GeoError, GeoPoint};
pub use id::*;
pub use invite::InviteCode;
pub use price::{CurrencyCode, Price};
pub use review::{ItemKind, ReviewDraft, ReviewError, ReviewItem, Scores};
pub use role::{AuthMethod, ReservationType, UserRole};
pub use shop::{BusinessHours, DayOfWeek, Period, ShopDraft, ShopError, fixed_utc_offset};
