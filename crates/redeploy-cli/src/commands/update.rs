use super::load_config;
use crate::console::{ConsoleLogger, StdinOperator};
use clap::{Args, ValueEnum};
use redeploy_core::{AutoOperator, SharedLogger, SharedOperator, TracingLogger};
use redeploy_deployer::{ProcessSupervisor, SharedRunner};
use redeploy_deployments::UpdateOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    /// Colored progress on stdout
    Console,
    /// Route progress through the diagnostics subscriber
    Tracing,
}

#[derive(Args)]
pub struct UpdateCommand {
    /// Project directory to update; repeatable, replaces the configured list
    #[arg(long = "project", short = 'p')]
    projects: Vec<PathBuf>,

    /// Number of configuration snapshots to keep per project
    #[arg(long, env = "REDEPLOY_RETENTION")]
    retention: Option<usize>,

    /// Answer yes to rebuild and continue prompts
    #[arg(long, short = 'y', conflicts_with = "no_input")]
    yes: bool,

    /// Never prompt; every question takes its default answer
    #[arg(long)]
    no_input: bool,

    /// Where progress messages go
    #[arg(long, value_enum, default_value = "console")]
    output: OutputMode,
}

impl UpdateCommand {
    pub fn execute(self, config_path: Option<PathBuf>) -> anyhow::Result<()> {
        let config = load_config(config_path.as_deref(), self.projects, self.retention)?;
        if config.projects.is_empty() {
            anyhow::bail!("No projects configured. Pass --project or list them in the config file");
        }
        info!("Updating {} project(s)", config.projects.len());

        let logger: SharedLogger = match self.output {
            OutputMode::Console => Arc::new(ConsoleLogger::new()),
            OutputMode::Tracing => Arc::new(TracingLogger),
        };
        let operator: SharedOperator = if self.yes {
            Arc::new(AutoOperator::assume_yes())
        } else if self.no_input {
            Arc::new(AutoOperator::defaults())
        } else {
            Arc::new(StdinOperator::new())
        };
        let runner: SharedRunner = Arc::new(ProcessSupervisor::new(logger.clone()));

        let rt = tokio::runtime::Runtime::new()?;
        let orchestrator = UpdateOrchestrator::new(&config, runner, operator, logger);
        let summary = rt.block_on(orchestrator.run());

        if let Some(reason) = &summary.aborted {
            anyhow::bail!("Update run stopped early: {}", reason);
        }
        if summary.failed() > 0 {
            anyhow::bail!(
                "{} of {} project(s) failed to update",
                summary.failed(),
                summary.reports.len()
            );
        }
        Ok(())
    }
}
