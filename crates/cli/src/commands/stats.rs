//! Counter maintenance.

use ramen_map_server::db::StatsRepository;

use super::{CliError, connect};

/// Reset the shop counter to the number of rows in `shop`.
///
/// # Errors
///
/// Returns `CliError` if the database is unreachable.
pub async fn recount() -> Result<(), CliError> {
    let pool = connect().await?;
    let shops = StatsRepository::new(&pool).recount_shops().await?;
    tracing::info!("Shop counter set to {shops}");
    Ok(())
}
