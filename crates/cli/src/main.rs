//! PriceLens CLI: the main entry point.
//!
//! Commands:
//! - `serve`    Start the HTTP query endpoint
//! - `ask`      Answer a single query in the terminal
//! - `onboard`  Write a default config
//! - `doctor`   Check config, credentials, and reachability

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pricelens",
    about = "PriceLens — ask cloud compute pricing questions in plain language",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP query endpoint
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer a single pricing query
    Ask {
        /// The question, in English, Traditional Chinese, or Japanese
        query: String,

        /// Print the full structured result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default configuration file
    Onboard,

    /// Diagnose configuration and service reachability
    Doctor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `ask --json` output stays clean.
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { query, json } => commands::ask::run(query, json).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
