//! Redeploy CLI - rebuild and restart compose projects from their git checkouts

mod commands;
mod console;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{BackupsCommand, UpdateCommand, ValidateCommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level for diagnostics (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "REDEPLOY_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "REDEPLOY_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    /// Configuration file (defaults to <config dir>/redeploy/config.yaml)
    #[arg(long, env = "REDEPLOY_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull, rebuild and restart every configured project
    Update(UpdateCommand),
    /// Check that project directories are deployable
    Validate(ValidateCommand),
    /// Inspect and prune configuration snapshots
    Backups(BackupsCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // If RUST_LOG is set, use it directly; otherwise scope the level to our crates
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .context("Invalid RUST_LOG environment variable")?
    } else {
        tracing_subscriber::EnvFilter::try_new(format!(
            "redeploy={level},\
             redeploy_cli={level},\
             redeploy_core={level},\
             redeploy_deployer={level},\
             redeploy_backup={level},\
             redeploy_deployments={level}",
            level = cli.log_level
        ))
        .with_context(|| format!("Invalid log level '{}'", cli.log_level))?
    };

    // Diagnostics go to stderr; stdout belongs to the operator console
    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    match cli.command {
        Commands::Update(update_cmd) => update_cmd.execute(cli.config),
        Commands::Validate(validate_cmd) => validate_cmd.execute(cli.config),
        Commands::Backups(backups_cmd) => backups_cmd.execute(cli.config),
    }
}
