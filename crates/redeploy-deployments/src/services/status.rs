use super::inspector::ProjectDescriptor;
use redeploy_core::{LogLevel, SharedLogger};
use redeploy_deployer::{CommandRequest, SharedRunner};
use tracing::warn;

/// Post-update container status and recent logs. Never fails; problems are
/// reported as warnings.
pub struct StatusReporter {
    runner: SharedRunner,
    logger: SharedLogger,
    tail_lines: usize,
}

impl StatusReporter {
    pub fn new(runner: SharedRunner, logger: SharedLogger, tail_lines: usize) -> Self {
        Self {
            runner,
            logger,
            tail_lines,
        }
    }

    pub async fn report(&self, project: &ProjectDescriptor) {
        let compose = project.compose_commands();
        self.logger.info(&format!("Status of {}", project.name));

        let requests = [
            CommandRequest::new(compose.status(), "Container status").in_dir(&project.path),
            CommandRequest::new(
                compose.logs_tail(self.tail_lines),
                format!("Last {} log lines", self.tail_lines),
            )
            .in_dir(&project.path),
        ];

        for request in requests {
            let description = request.description.clone();
            match self.runner.run(request).await {
                Ok(result) if result.success => {}
                Ok(result) => self.logger.log(
                    LogLevel::Warning,
                    &format!("{} exited with {}", description, result.exit_code),
                    1,
                ),
                Err(e) => {
                    warn!("Status command for {} failed: {}", project.name, e);
                    self.logger.log(
                        LogLevel::Warning,
                        &format!("{} unavailable: {}", description, e),
                        1,
                    );
                }
            }
        }
    }
}
