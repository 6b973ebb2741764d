//! Balloon Boutique CLI - Database migrations and schedule tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bb-cli migrate
//!
//! # Show delivery slots and availability for a day
//! bb-cli slots 2025-06-10
//!
//! # Same, without a database, pretending 18:00 local is booked
//! bb-cli slots 2025-06-10 --offline --booked 2025-06-10T15:00:00Z
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `slots` - Print the delivery schedule for a date

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bb-cli")]
#[command(author, version, about = "Balloon Boutique CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run storefront database migrations
    Migrate,
    /// Print delivery slots with availability for a date
    Slots {
        /// Date in the store timezone (`YYYY-MM-DD`)
        date: String,

        /// Evaluate as of this RFC 3339 instant instead of the current time
        #[arg(long)]
        now: Option<String>,

        /// Extra booked instant (RFC 3339); may be repeated
        #[arg(long = "booked")]
        booked: Vec<String>,

        /// Don't load bookings from the database
        #[arg(long)]
        offline: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Slots {
            date,
            now,
            booked,
            offline,
        } => {
            commands::slots::show(&commands::slots::SlotsArgs {
                date,
                now,
                booked,
                offline,
            })
            .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_slots() {
        let cli = Cli::try_parse_from([
            "bb-cli",
            "slots",
            "2025-06-10",
            "--offline",
            "--booked",
            "2025-06-10T15:00:00Z",
            "--booked",
            "2025-06-10T17:00:00Z",
        ]);
        let Ok(Cli {
            command: Commands::Slots {
                date,
                booked,
                offline,
                now,
            },
        }) = cli
        else {
            panic!("expected slots command");
        };
        assert_eq!(date, "2025-06-10");
        assert_eq!(booked.len(), 2);
        assert!(offline);
        assert!(now.is_none());
    }

    #[test]
    fn test_cli_parses_migrate() {
        assert!(matches!(
            Cli::try_parse_from(["bb-cli", "migrate"]).map(|c| c.command),
            Ok(Commands::Migrate)
        ));
    }
}
