//! Top-level update run over every configured project

use super::coordinator::ContainerLifecycleCoordinator;
use super::inspector::ProjectInspector;
use super::status::StatusReporter;
use redeploy_core::{
    project_name, LogLevel, OperatorPrompt, ProjectReport, RunSummary, SharedLogger,
    SharedOperator, UpdateError, UpdaterConfig,
};
use redeploy_deployer::commands::DOCKER_INFO;
use redeploy_deployer::{CommandRequest, SharedRunner};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const COMPLETION_MESSAGE: &str = "Update run finished. Press Enter to exit.";

/// Outcome of the daemon readiness gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonGate {
    Ready,
    /// The operator declined to probe again; carries the last probe failure
    Aborted(String),
}

pub struct UpdateOrchestrator {
    coordinator: ContainerLifecycleCoordinator,
    status: StatusReporter,
    runner: SharedRunner,
    operator: SharedOperator,
    logger: SharedLogger,
    projects: Vec<PathBuf>,
}

impl UpdateOrchestrator {
    pub fn new(
        config: &UpdaterConfig,
        runner: SharedRunner,
        operator: SharedOperator,
        logger: SharedLogger,
    ) -> Self {
        Self {
            coordinator: ContainerLifecycleCoordinator::new(
                runner.clone(),
                operator.clone(),
                logger.clone(),
                config,
            ),
            status: StatusReporter::new(runner.clone(), logger.clone(), config.log_tail_lines),
            runner,
            operator,
            logger,
            projects: config.projects.clone(),
        }
    }

    /// Update every project in order. Always ends by asking the operator to
    /// acknowledge the completion notice, whatever happened.
    pub async fn run(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        info!("Starting update run over {} project(s)", self.projects.len());

        match self.wait_for_daemon().await {
            DaemonGate::Ready => self.update_projects(&mut summary).await,
            DaemonGate::Aborted(reason) => {
                summary.aborted = Some(UpdateError::DaemonUnavailable(reason));
            }
        }

        self.report_completion(&summary);
        self.operator.acknowledge(COMPLETION_MESSAGE).await;
        summary
    }

    /// Probe the daemon until it answers or the operator gives up
    pub async fn wait_for_daemon(&self) -> DaemonGate {
        loop {
            let reason = match self
                .runner
                .run(CommandRequest::new(DOCKER_INFO, "Checking Docker daemon").quiet())
                .await
            {
                Ok(result) if result.success => {
                    debug!("Docker daemon is reachable");
                    return DaemonGate::Ready;
                }
                Ok(result) => result
                    .stderr
                    .iter()
                    .map(|line| line.trim())
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("docker info exited with {}", result.exit_code)),
                Err(e) => e.to_string(),
            };

            let error = UpdateError::DaemonUnavailable(reason.clone());
            warn!("{}", error);
            self.logger.error(&error.to_string());

            if !self.operator.confirm(&OperatorPrompt::RetryDaemon).await {
                return DaemonGate::Aborted(reason);
            }
            self.logger.info("Retrying Docker daemon probe");
        }
    }

    async fn update_projects(&self, summary: &mut RunSummary) {
        let total = self.projects.len();

        for (index, path) in self.projects.iter().enumerate() {
            let name = project_name(path);
            self.logger
                .info(&format!("Project {}/{}: {}", index + 1, total, name));

            let result = if path.exists() {
                self.coordinator.update(path).await
            } else {
                let error = UpdateError::ProjectPathNotFound(path.clone());
                self.logger.error(&error.to_string());
                Err(error)
            };

            let mut stop = false;
            match &result {
                Ok(_) => match ProjectInspector::inspect(path).await {
                    Ok(project) => self.status.report(&project).await,
                    Err(e) => self.logger.log(
                        LogLevel::Warning,
                        &format!("Skipping status report: {}", e),
                        1,
                    ),
                },
                Err(UpdateError::ProjectPathNotFound(_)) => {}
                Err(e) => {
                    let remaining = total - index - 1;
                    let prompt = OperatorPrompt::ContinueAfterFailure {
                        project: name.clone(),
                    };
                    if remaining > 0 && !self.operator.confirm(&prompt).await {
                        self.logger.warning(&format!(
                            "Stopping; {} project(s) not updated",
                            remaining
                        ));
                        summary.aborted = Some(e.clone());
                        stop = true;
                    }
                }
            }

            summary.reports.push(ProjectReport {
                path: path.clone(),
                name,
                result,
            });
            if stop {
                break;
            }
        }
    }

    fn report_completion(&self, summary: &RunSummary) {
        self.logger.info("Summary");
        for report in &summary.reports {
            match &report.result {
                Ok(outcome) => self
                    .logger
                    .log(LogLevel::Success, &format!("{}: {}", report.name, outcome), 1),
                Err(e) => self.logger.log(
                    LogLevel::Error,
                    &format!("{}: failed at {} ({})", report.name, e.stage(), e),
                    1,
                ),
            }
        }
        if let Some(reason) = &summary.aborted {
            self.logger
                .log(LogLevel::Warning, &format!("Run stopped early: {}", reason), 1);
        }

        let message = format!(
            "{} succeeded, {} failed",
            summary.succeeded(),
            summary.failed()
        );
        if summary.all_succeeded() {
            self.logger.success(&message);
        } else {
            self.logger.warning(&message);
        }
    }
}
