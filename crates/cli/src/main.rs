//! Forno CLI - migrations, menu seeding and delivery diagnostics.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! forno migrate
//!
//! # Load categories, products, zones and settings from YAML
//! forno seed menu.yaml
//!
//! # Check whether an address can be delivered to
//! forno delivery check "Via Torino 12, Milano" --amount 24.50
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed the menu from a YAML file
//! - `delivery check` - Resolve an address against the live delivery zones

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "forno")]
#[command(author, version, about = "Forno CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the menu, delivery zones and settings from a YAML file
    Seed {
        /// Path to the YAML file
        file: String,
    },
    /// Delivery diagnostics
    Delivery {
        #[command(subcommand)]
        action: DeliveryAction,
    },
}

#[derive(Subcommand)]
enum DeliveryAction {
    /// Resolve an address the way the storefront does
    Check {
        /// Free-text address
        address: String,

        /// Order amount used for the free-delivery rule
        #[arg(short, long, default_value = "0")]
        amount: Decimal,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            commands::seed::menu(&file).await?;
        }
        Commands::Delivery { action } => match action {
            DeliveryAction::Check { address, amount } => {
                let validation = commands::delivery::check(&address, amount).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{}", serde_json::to_string_pretty(&validation)?);
                }
            }
        },
    }
    Ok(())
}
