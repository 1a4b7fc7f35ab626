//! Webhook Replay CLI - Inspect captured requests and replay them
//!
//! Usage:
//!   whreplay                    Interactive dashboard
//!   whreplay register           Register a fresh identity
//!   whreplay url                Print the custom capture URL
//!   whreplay open               Open the custom URL in the browser
//!   whreplay ls                 List captured requests
//!   whreplay show <ID>          Show a captured request and its replays
//!   whreplay replay <ID> [URL]  Replay a captured request

mod api;
mod commands;
mod config;
mod format;
mod idle;
mod poller;
mod qr;
mod session;
mod tui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "whreplay")]
#[command(author = "Webhook Replay Team")]
#[command(version)]
#[command(about = "Inspect captured webhook requests and replay them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Replay backend URL (overrides the config file)
    #[arg(long, global = true, env = "WHREPLAY_SERVER")]
    server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive dashboard (default)
    Watch,

    /// Register a fresh identity (drops captured requests)
    Register {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the custom capture URL
    Url,

    /// Open the custom URL in the browser
    Open,

    /// List captured requests
    Ls,

    /// Show one captured request with its replays
    Show {
        /// Request ID
        id: i64,
    },

    /// Replay a captured request
    Replay {
        /// Request ID
        id: i64,

        /// Destination URL (defaults to the last one used)
        url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Watch);

    // Ensure config directories exist
    config::ensure_dirs()?;

    // The dashboard owns the terminal, so it logs to a file
    init_logging(cli.verbose, matches!(command, Commands::Watch))?;

    let config = Config::load()?.with_server(cli.server);
    tracing::debug!("Using backend {}", config.base_url());

    // Handle commands
    match command {
        Commands::Watch => {
            tui::run(config).await?;
        }

        Commands::Register { yes } => {
            commands::identity::register(config, yes).await?;
        }

        Commands::Url => {
            commands::identity::url(config).await?;
        }

        Commands::Open => {
            commands::identity::open(config).await?;
        }

        Commands::Ls => {
            commands::requests::list(config).await?;
        }

        Commands::Show { id } => {
            commands::requests::show(config, id).await?;
        }

        Commands::Replay { id, url } => {
            commands::replay::run(config, id, url).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, to_file: bool) -> Result<()> {
    let default_filter = if verbose { "debug" } else { "warn,whreplay=info" };
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| default_filter.into()),
    );

    if to_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(config::tui_log_file())
            .context("Failed to open log file")?;
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}
