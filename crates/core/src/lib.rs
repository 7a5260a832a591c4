//! Ramen Map Core - Shared domain types.
//!
//! This crate provides the types used across all Ramen Map components:
//! - `server` - Public map/directory site, review API, and admin dashboard
//! - `cli` - Command-line tools for migrations, invites, and backfills
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and easy to test.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices, roles, shops, reviews, invites
//! - [`search`] - Search token generation for array-containment lookups
//! - [`pagination`] - Keyset cursors and pages
//! - [`transit`] - Nearest-station selection rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod search;
pub mod transit;
pub mod types;

pub use types::*;
