use super::{load_config, print_info, print_success, print_warning};
use anyhow::Context;
use clap::{Args, Subcommand};
use colored::Colorize;
use redeploy_backup::{BackupManager, BackupRecord};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct BackupsCommand {
    #[command(subcommand)]
    command: BackupsCommands,
}

#[derive(Subcommand)]
enum BackupsCommands {
    /// List a project's configuration snapshots, newest first
    List(ListBackupsArgs),
    /// Delete all but the newest snapshots of a project
    Prune(PruneBackupsArgs),
}

#[derive(Args)]
struct ListBackupsArgs {
    /// Project directory
    #[arg(long)]
    project: PathBuf,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PruneBackupsArgs {
    /// Project directory
    #[arg(long)]
    project: PathBuf,

    /// Snapshots to keep (defaults to the configured retention)
    #[arg(long)]
    keep: Option<usize>,
}

#[derive(Serialize)]
struct BackupEntry {
    created_at: String,
    path: String,
}

impl From<&BackupRecord> for BackupEntry {
    fn from(record: &BackupRecord) -> Self {
        Self {
            created_at: record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            path: record.path.display().to_string(),
        }
    }
}

impl BackupsCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> anyhow::Result<()> {
        let config = load_config(config_path.as_deref(), Vec::new(), None)?;
        let manager = BackupManager::from_config(&config);
        match self.command {
            BackupsCommands::List(args) => Self::execute_list(&manager, args),
            BackupsCommands::Prune(args) => Self::execute_prune(&manager, args),
        }
    }

    fn execute_list(manager: &BackupManager, args: ListBackupsArgs) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        let records = rt
            .block_on(manager.list(&args.project))
            .with_context(|| format!("Failed to list backups of {}", args.project.display()))?;
        let entries: Vec<BackupEntry> = records.iter().map(BackupEntry::from).collect();

        if args.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            print_warning(&format!("No backups in {}", args.project.display()));
            return Ok(());
        }

        println!();
        println!(
            "{:<22} {}",
            "CREATED".bright_white().bold(),
            "PATH".bright_white().bold()
        );
        for entry in &entries {
            println!("{:<22} {}", entry.created_at.bright_cyan(), entry.path);
        }
        println!();
        print_info("Total", &entries.len().to_string());
        Ok(())
    }

    fn execute_prune(manager: &BackupManager, args: PruneBackupsArgs) -> anyhow::Result<()> {
        let keep = args.keep.unwrap_or_else(|| manager.retention());
        info!("Pruning backups of {} to {}", args.project.display(), keep);

        let rt = tokio::runtime::Runtime::new()?;
        let removed = rt
            .block_on(manager.prune(&args.project, keep, None))
            .with_context(|| format!("Failed to prune backups of {}", args.project.display()))?;

        for path in &removed {
            println!("   {} {}", "-".bright_red(), path.display());
        }
        print_success(&format!(
            "Removed {} backup(s), kept at most {}",
            removed.len(),
            keep
        ));
        Ok(())
    }
}
