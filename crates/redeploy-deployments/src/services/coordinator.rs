//! Per-project update lifecycle
//!
//! validate → backup → sync source → stop (escalating) → build → start → verify.
//! Every stage failure is converted into [`UpdateError`] here and logged before
//! it is returned; nothing more specific leaves this module.

use super::inspector::{ProjectDescriptor, ProjectInspector};
use redeploy_backup::BackupManager;
use redeploy_core::{
    project_name, LogLevel, OperatorPrompt, ProjectOutcome, SharedLogger, SharedOperator,
    UpdateError, UpdateResult, UpdaterConfig,
};
use redeploy_deployer::commands::{
    docker_stop, BRANCH_UP_TO_DATE, GIT_BRANCH_STATUS, GIT_FETCH_ALL, GIT_PULL,
};
use redeploy_deployer::{CommandExecutionResult, CommandRequest, ComposeCommands, SharedRunner};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

const TOTAL_STAGES: usize = 7;

/// Rung of the stop escalation ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopLevel {
    /// `down` with a grace period
    Graceful,
    /// `down` removing local images, volumes and orphans
    Forced,
    /// `docker stop` on one container id
    Direct,
}

impl fmt::Display for StopLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopLevel::Graceful => write!(f, "graceful"),
            StopLevel::Forced => write!(f, "forced"),
            StopLevel::Direct => write!(f, "direct"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopEscalationAttempt {
    pub level: StopLevel,
    pub targets: Vec<String>,
    pub succeeded: bool,
}

/// Drives one project through the update stages
pub struct ContainerLifecycleCoordinator {
    runner: SharedRunner,
    operator: SharedOperator,
    logger: SharedLogger,
    backups: BackupManager,
    stop_timeout_secs: u64,
}

impl ContainerLifecycleCoordinator {
    pub fn new(
        runner: SharedRunner,
        operator: SharedOperator,
        logger: SharedLogger,
        config: &UpdaterConfig,
    ) -> Self {
        Self {
            runner,
            operator,
            logger,
            backups: BackupManager::from_config(config),
            stop_timeout_secs: config.stop_timeout_secs,
        }
    }

    /// Run every stage for the project at `project_dir`
    pub async fn update(&self, project_dir: &Path) -> UpdateResult<ProjectOutcome> {
        let name = project_name(project_dir);
        info!("Updating project {} at {}", name, project_dir.display());
        self.logger.info(&format!("Updating {}", name));

        match self.run_stages(project_dir).await {
            Ok(outcome) => {
                self.logger.success(&format!("{}: {}", name, outcome));
                Ok(outcome)
            }
            Err(e) => {
                warn!("Update of {} failed at {} stage: {}", name, e.stage(), e);
                self.logger.error(&format!("{}: {}", name, e));
                Err(e)
            }
        }
    }

    async fn run_stages(&self, project_dir: &Path) -> UpdateResult<ProjectOutcome> {
        self.stage(1, "Validating project");
        let project = ProjectInspector::inspect(project_dir)
            .await
            .map_err(|e| UpdateError::Validation(e.to_string()))?;
        self.detail(&format!(
            "Found {}{}",
            project.compose_variant,
            if project.has_env_file { " and .env" } else { "" }
        ));

        self.stage(2, "Backing up configuration");
        let record = self
            .backups
            .snapshot(&project.path, &project.config_files())
            .await
            .map_err(|e| UpdateError::Backup(e.to_string()))?;
        self.detail(&format!("Saved to {}", record.path.display()));

        self.stage(3, "Synchronizing source");
        if !self.sync_source(&project).await? {
            self.logger
                .info(&format!("{} is up to date, nothing to rebuild", project.name));
            return Ok(ProjectOutcome::Unchanged);
        }

        let compose = project.compose_commands();

        self.stage(4, "Stopping containers");
        self.stop_containers(&project, &compose).await?;

        self.stage(5, "Building images");
        let build = self
            .run(
                CommandRequest::new(compose.build(), "Building images without cache")
                    .in_dir(&project.path)
                    .build(),
            )
            .await
            .map_err(UpdateError::Build)?;
        if !build.success {
            return Err(UpdateError::Build(failure_detail(&build)));
        }

        self.stage(6, "Starting containers");
        let start = self
            .run(CommandRequest::new(compose.start(), "Starting containers").in_dir(&project.path))
            .await
            .map_err(UpdateError::Start)?;
        if !start.success {
            return Err(UpdateError::Start(failure_detail(&start)));
        }

        self.stage(7, "Verifying containers");
        self.verify(&project, &compose).await;

        Ok(ProjectOutcome::Updated)
    }

    /// Fetch and pull the checkout. Returns `false` when the branch is already
    /// current and the operator chose not to rebuild.
    async fn sync_source(&self, project: &ProjectDescriptor) -> UpdateResult<bool> {
        let fetch = self
            .run(CommandRequest::new(GIT_FETCH_ALL, "Fetching remote changes").in_dir(&project.path))
            .await
            .map_err(UpdateError::SourceSync)?;
        if !fetch.success {
            return Err(UpdateError::SourceSync(format!(
                "git fetch failed: {}",
                failure_detail(&fetch)
            )));
        }

        let status = self
            .run(
                CommandRequest::new(GIT_BRANCH_STATUS, "Checking branch status")
                    .in_dir(&project.path)
                    .quiet(),
            )
            .await
            .map_err(UpdateError::SourceSync)?;
        if !status.success {
            return Err(UpdateError::SourceSync(format!(
                "git status failed: {}",
                failure_detail(&status)
            )));
        }

        if status.stdout_text().contains(BRANCH_UP_TO_DATE) {
            debug!("{} has no upstream changes", project.name);
            let prompt = OperatorPrompt::RebuildWithoutUpdate {
                project: project.name.clone(),
            };
            return Ok(self.operator.confirm(&prompt).await);
        }

        let pull = self
            .run(CommandRequest::new(GIT_PULL, "Pulling changes").in_dir(&project.path))
            .await
            .map_err(UpdateError::SourceSync)?;
        if !pull.success {
            return Err(UpdateError::SourceSync(format!(
                "git pull failed: {}",
                failure_detail(&pull)
            )));
        }
        Ok(true)
    }

    /// Stop the project's running containers, escalating until a rung reports
    /// success, then confirm nothing is left running.
    pub async fn stop_containers(
        &self,
        project: &ProjectDescriptor,
        compose: &ComposeCommands,
    ) -> UpdateResult<Vec<StopEscalationAttempt>> {
        let targets = match self.running_containers(project, compose).await {
            Ok(ids) if ids.is_empty() => {
                self.detail("No running containers");
                return Ok(Vec::new());
            }
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not list running containers of {}: {}", project.name, e);
                self.logger.log(
                    LogLevel::Warning,
                    &format!("Could not list running containers: {}", e),
                    1,
                );
                Vec::new()
            }
        };

        let attempts = self.stop_ladder(project, compose, &targets).await;

        match self.running_containers(project, compose).await {
            Ok(remaining) if remaining.is_empty() => {
                self.detail("All containers stopped");
                Ok(attempts)
            }
            Ok(remaining) => Err(UpdateError::ContainersNotStopped { remaining }),
            Err(e) => {
                warn!("Could not confirm containers of {} stopped: {}", project.name, e);
                Err(UpdateError::ContainersNotStopped { remaining: targets })
            }
        }
    }

    async fn stop_ladder(
        &self,
        project: &ProjectDescriptor,
        compose: &ComposeCommands,
        targets: &[String],
    ) -> Vec<StopEscalationAttempt> {
        let mut attempts = Vec::new();

        let graceful = self
            .stop_attempt(
                project,
                StopLevel::Graceful,
                compose.stop_graceful(self.stop_timeout_secs),
                targets.to_vec(),
            )
            .await;
        let stopped = graceful.succeeded;
        attempts.push(graceful);
        if stopped {
            return attempts;
        }

        self.logger
            .log(LogLevel::Warning, "Graceful stop failed, forcing", 1);
        let forced = self
            .stop_attempt(project, StopLevel::Forced, compose.stop_forced(), targets.to_vec())
            .await;
        let stopped = forced.succeeded;
        attempts.push(forced);
        if stopped {
            return attempts;
        }

        self.logger.log(
            LogLevel::Warning,
            "Forced stop failed, stopping containers one by one",
            1,
        );
        for id in targets {
            let direct = self
                .stop_attempt(project, StopLevel::Direct, docker_stop(id), vec![id.clone()])
                .await;
            attempts.push(direct);
        }

        attempts
    }

    async fn stop_attempt(
        &self,
        project: &ProjectDescriptor,
        level: StopLevel,
        command: String,
        targets: Vec<String>,
    ) -> StopEscalationAttempt {
        let description = match level {
            StopLevel::Direct => format!("Stopping container {}", targets.join(", ")),
            _ => format!("Stopping containers ({})", level),
        };
        let succeeded = match self
            .run(CommandRequest::new(command, description).in_dir(&project.path))
            .await
        {
            Ok(result) => result.success,
            Err(e) => {
                warn!("{} stop of {} could not run: {}", level, project.name, e);
                false
            }
        };
        debug!("{} stop of {}: succeeded={}", level, project.name, succeeded);

        StopEscalationAttempt {
            level,
            targets,
            succeeded,
        }
    }

    async fn verify(&self, project: &ProjectDescriptor, compose: &ComposeCommands) {
        match self.running_containers(project, compose).await {
            Ok(ids) if ids.is_empty() => self.logger.log(
                LogLevel::Warning,
                "No containers are running after start",
                1,
            ),
            Ok(ids) => self.detail(&format!("{} container(s) running", ids.len())),
            Err(e) => self.logger.log(
                LogLevel::Warning,
                &format!("Could not verify containers: {}", e),
                1,
            ),
        }
    }

    async fn running_containers(
        &self,
        project: &ProjectDescriptor,
        compose: &ComposeCommands,
    ) -> Result<Vec<String>, String> {
        let result = self
            .run(
                CommandRequest::new(compose.running_containers(), "Listing running containers")
                    .in_dir(&project.path)
                    .quiet(),
            )
            .await?;
        if !result.success {
            return Err(failure_detail(&result));
        }
        Ok(result.stdout_values())
    }

    async fn run(&self, request: CommandRequest) -> Result<CommandExecutionResult, String> {
        self.runner.run(request).await.map_err(|e| e.to_string())
    }

    fn stage(&self, number: usize, label: &str) {
        self.logger.log(
            LogLevel::Progress,
            &format!("[{}/{}] {}", number, TOTAL_STAGES, label),
            1,
        );
    }

    fn detail(&self, message: &str) {
        self.logger.log(LogLevel::Info, message, 2);
    }
}

/// Short reason for a failed command: last stderr line, or the exit code
fn failure_detail(result: &CommandExecutionResult) -> String {
    result
        .stderr
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("exit code {}", result.exit_code))
}
