//! Administrator management.
//!
//! There is no sign-up path to the admin role; the first admin is promoted
//! here, after registering normally with an invite code.

use ramen_map_core::Email;
use ramen_map_server::services::ProfileService;

use super::{CliError, connect};

/// Grant the admin role to the account with `email`.
///
/// The user's existing reviews pick up the new role.
///
/// # Errors
///
/// Returns `CliError::InvalidInput` for a malformed email and
/// `CliError::Profile` if no account has that email.
pub async fn promote(email: &str) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::InvalidInput(e.to_string()))?;
    let pool = connect().await?;

    let user = ProfileService::new(&pool).promote_by_email(&email).await?;

    tracing::info!(
        "Promoted {} ({}) to admin. User ID: {}",
        user.display_name,
        user.email,
        user.id
    );
    Ok(())
}
