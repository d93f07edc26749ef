pub mod backups;
pub mod update;
pub mod validate;

pub use backups::BackupsCommand;
pub use update::UpdateCommand;
pub use validate::ValidateCommand;

use anyhow::Context;
use colored::Colorize;
use redeploy_core::UpdaterConfig;
use std::path::{Path, PathBuf};

/// Load the configuration file and apply command-line overrides.
///
/// Without an explicit path the per-user default is used; a missing file means
/// defaults. Non-empty `projects` replaces the configured list.
pub(crate) fn load_config(
    path: Option<&Path>,
    projects: Vec<PathBuf>,
    retention: Option<usize>,
) -> anyhow::Result<UpdaterConfig> {
    let mut config = match path.map(Path::to_path_buf).or_else(UpdaterConfig::default_path) {
        Some(path) => UpdaterConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => UpdaterConfig::default(),
    };

    if !projects.is_empty() {
        config = config.with_projects(projects);
    }
    if let Some(retention) = retention {
        config = config.with_backup_retention(retention);
    }

    Ok(config)
}

fn print_success(message: &str) {
    println!("{} {}", "✔".bright_green(), message.bright_white());
}

fn print_warning(message: &str) {
    println!("{} {}", "!".bright_yellow(), message.bright_yellow());
}

fn print_error(message: &str) {
    println!("{} {}", "✖".bright_red(), message.bright_red());
}

fn print_info(label: &str, value: &str) {
    println!(
        "   {} {}",
        format!("{}:", label).bright_white().bold(),
        value.bright_cyan()
    );
}
