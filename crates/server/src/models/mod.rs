//! Session-level models.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
