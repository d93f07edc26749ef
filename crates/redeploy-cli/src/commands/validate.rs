use super::{load_config, print_error, print_info, print_success};
use clap::Args;
use redeploy_deployments::ProjectInspector;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateCommand {
    /// Project directory to check; repeatable, replaces the configured list
    #[arg(long = "project", short = 'p')]
    projects: Vec<PathBuf>,
}

impl ValidateCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> anyhow::Result<()> {
        let config = load_config(config_path.as_deref(), self.projects, None)?;
        print_success("Configuration is valid");
        print_info("Backup retention", &config.backup_retention.to_string());
        print_info("Timestamp format", &config.timestamp_format);

        if config.projects.is_empty() {
            anyhow::bail!("No projects configured. Pass --project or list them in the config file");
        }

        let rt = tokio::runtime::Runtime::new()?;
        let mut invalid = 0;
        for path in &config.projects {
            match rt.block_on(ProjectInspector::inspect(path)) {
                Ok(project) => {
                    let env = if project.has_env_file {
                        "with .env"
                    } else {
                        "without .env"
                    };
                    print_success(&format!(
                        "{}: {} {}",
                        project.name, project.compose_variant, env
                    ));
                }
                Err(e) => {
                    invalid += 1;
                    print_error(&format!("{}: {}", path.display(), e));
                }
            }
        }

        if invalid > 0 {
            anyhow::bail!("{} of {} project(s) are not deployable", invalid, config.projects.len());
        }
        Ok(())
    }
}
