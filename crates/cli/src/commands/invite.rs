//! Invite code generation.

use ramen_map_server::db::InviteRepository;

use super::{CliError, connect};

/// Most codes generated in one run.
const MAX_COUNT: usize = 1000;

/// Generate `count` invite codes and print one per line.
///
/// # Errors
///
/// Returns `CliError::InvalidInput` if `count` is zero or above the limit.
pub async fn create(count: usize) -> Result<(), CliError> {
    if !(1..=MAX_COUNT).contains(&count) {
        return Err(CliError::InvalidInput(format!(
            "count must be between 1 and {MAX_COUNT}"
        )));
    }

    let pool = connect().await?;
    let codes = InviteRepository::new(&pool).create_many(count, None).await?;

    #[allow(clippy::print_stdout)]
    {
        for code in &codes {
            println!("{}", code.code);
        }
    }
    tracing::info!("Created {} invite code(s)", codes.len());
    Ok(())
}
