//! Search token maintenance.
//!
//! Needed after changing the tokenizer, or after importing rows without
//! tokens. Reindexing reviews also re-copies author display names, avatars
//! and roles from the user table.

use sqlx::PgPool;

use ramen_map_server::db::{ReviewRepository, ShopRepository, UserRepository};

use super::CliError;

/// Recompute shop search tokens.
///
/// # Errors
///
/// Returns `CliError::Repository` if a query fails.
pub async fn shops(pool: &PgPool) -> Result<(), CliError> {
    let updated = ShopRepository::new(pool).reindex_all().await?;
    tracing::info!("Reindexed {updated} shop(s)");
    Ok(())
}

/// Refresh review author fields and search tokens.
///
/// # Errors
///
/// Returns `CliError::Repository` if a query fails.
pub async fn reviews(pool: &PgPool) -> Result<(), CliError> {
    let updated = ReviewRepository::new(pool).reindex_all().await?;
    tracing::info!("Reindexed {updated} review(s)");
    Ok(())
}

/// Recompute user search tokens.
///
/// # Errors
///
/// Returns `CliError::Repository` if a query fails.
pub async fn users(pool: &PgPool) -> Result<(), CliError> {
    let updated = UserRepository::new(pool).reindex_all().await?;
    tracing::info!("Reindexed {updated} user(s)");
    Ok(())
}
