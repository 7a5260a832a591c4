//! Ramen Map CLI - database migrations and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ramen-cli migrate
//!
//! # Give an existing account the admin role
//! ramen-cli admin promote -e owner@example.jp
//!
//! # Print five new invite codes
//! ramen-cli invite create -n 5
//!
//! # Recompute search tokens and review author fields
//! ramen-cli reindex all
//!
//! # Recompute the shop counter
//! ramen-cli stats recount
//! ```
//!
//! All commands read `RAMEN_DATABASE_URL` (or `DATABASE_URL`), loading `.env`
//! if present.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "ramen-cli")]
#[command(author, version, about = "Ramen Map CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage administrators
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage invite codes
    Invite {
        #[command(subcommand)]
        action: InviteAction,
    },
    /// Recompute search tokens
    Reindex {
        #[arg(value_enum)]
        target: ReindexTarget,
    },
    /// Maintain the stats table
    Stats {
        #[command(subcommand)]
        action: StatsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing user
    Promote {
        /// Email address of the account
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum InviteAction {
    /// Generate new invite codes and print them
    Create {
        /// Number of codes
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
}

#[derive(Subcommand)]
enum StatsAction {
    /// Recompute the shop counter from the shop table
    Recount,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReindexTarget {
    Shops,
    Reviews,
    Users,
    All,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), commands::CliError> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => commands::admin::promote(&email).await?,
        },
        Commands::Invite { action } => match action {
            InviteAction::Create { count } => commands::invite::create(count).await?,
        },
        Commands::Reindex { target } => {
            let pool = commands::connect().await?;
            match target {
                ReindexTarget::Shops => commands::reindex::shops(&pool).await?,
                ReindexTarget::Reviews => commands::reindex::reviews(&pool).await?,
                ReindexTarget::Users => commands::reindex::users(&pool).await?,
                ReindexTarget::All => {
                    commands::reindex::shops(&pool).await?;
                    commands::reindex::reviews(&pool).await?;
                    commands::reindex::users(&pool).await?;
                }
            }
        }
        Commands::Stats { action } => match action {
            StatsAction::Recount => commands::stats::recount().await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_invite_count() {
        let cli = Cli::try_parse_from(["ramen-cli", "invite", "create", "-n", "3"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Invite {
                action: InviteAction::Create { count: 3 }
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_reindex_target() {
        assert!(Cli::try_parse_from(["ramen-cli", "reindex", "photos"]).is_err());
    }
}
