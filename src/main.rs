//! Gjort CLI entry point.

use anyhow::Result;
use clap::Parser;
use gjort::cli::{commands, Cli, Commands};
use gjort::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("gjort={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    let owner = cli
        .user
        .clone()
        .unwrap_or_else(|| settings.general.default_user.clone());

    // Execute command
    match &cli.command {
        Commands::Init => {
            commands::run_init(&settings)?;
        }

        Commands::Chat => {
            commands::run_chat(&owner, settings).await?;
        }

        Commands::Send {
            message,
            conversation,
        } => {
            commands::run_send(&owner, message, *conversation, settings).await?;
        }

        Commands::History {
            limit,
            before,
            conversation,
        } => {
            commands::run_history(&owner, *limit, *before, *conversation, settings).await?;
        }

        Commands::Task { action } => {
            commands::run_task(&owner, action, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, cli.config.as_deref(), settings)?;
        }
    }

    Ok(())
}
