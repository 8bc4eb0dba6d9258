//! Early-buyer bundle scanner for new Solana tokens
//!
//! Looks at the first buyers of a token and reports how many used freshly
//! created wallets, how profitable they are, and whether they trade with
//! each other.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use bundle_scanner::cli::commands;
use bundle_scanner::config::Config;

/// Early-buyer bundle scanner
#[derive(Parser)]
#[command(name = "scan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "scanner.toml", global = true)]
    config: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the early buyers of a token
    Run {
        /// Token mint address
        token: String,

        /// Maximum unique early buyers (default: scan.max_buyers)
        #[arg(long)]
        max_buyers: Option<usize>,

        /// Write the JSON report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replay recorded upstream responses instead of calling the APIs
        #[arg(long, env = "SCANNER_FIXTURE")]
        fixture: Option<PathBuf>,

        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show current configuration (secrets masked)
    Config,

    /// Check upstream health (Birdeye, RPC)
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_tracing(cli.json_logs);

    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run {
            token,
            max_buyers,
            output,
            fixture,
            compact,
        } => {
            commands::run(
                &config,
                &token,
                max_buyers,
                output.as_deref(),
                fixture.as_deref(),
                compact,
            )
            .await
        }
        Commands::Config => commands::show_config(&config),
        Commands::Health => commands::health(&config).await,
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Logs go to stderr so the JSON report on stdout stays clean
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bundle_scanner=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
