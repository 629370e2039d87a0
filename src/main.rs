//! chainsleuth - wallet investigation CLI
//!
//! Points a chain-detection and analysis pipeline at one or more wallet
//! addresses and prints JSON reports. Upstream outages degrade to
//! clearly-marked synthetic data instead of failing.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

use chainsleuth::cli::commands;
use chainsleuth::config::Config;

/// Wallet investigator: chain detection, transaction analytics,
/// fund-flow classification and risk scoring
#[derive(Parser)]
#[command(name = "chainsleuth")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Investigate one or more wallet addresses
    Investigate {
        /// Addresses to investigate
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Skip detection and force a chain (see `chains` for ids)
        #[arg(long)]
        chain: Option<String>,

        /// Transaction history window override
        #[arg(long)]
        max_transactions: Option<usize>,

        /// Skip the token-transfer fetch and analyze native history only
        #[arg(long)]
        no_token_transfers: bool,

        /// Pretty-print the JSON reports
        #[arg(long)]
        pretty: bool,
    },

    /// Classify an address without fetching any data
    Validate {
        /// Address to classify
        address: String,
    },

    /// List supported chains
    Chains,

    /// Show current configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chainsleuth=info".parse()?),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Investigate {
            addresses,
            chain,
            max_transactions,
            no_token_transfers,
            pretty,
        } => {
            commands::investigate(
                &config,
                &addresses,
                chain.as_deref(),
                max_transactions,
                !no_token_transfers,
                pretty,
            )
            .await
        }
        Commands::Validate { address } => commands::validate(&address),
        Commands::Chains => commands::chains(&config),
        Commands::Config => commands::show_config(&config),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
