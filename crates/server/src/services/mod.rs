//! Business logic services.
//!
//! - `auth` - Invite-gated sign-up, password login and Bearer tokens
//! - `profile_sync` - Profile changes and their review author fan-out

pub mod auth;
pub mod profile_sync;

pub use auth::{AuthError, AuthService};
pub use profile_sync::{ProfileError, ProfileService};
