//! Child process supervision

use crate::output::{classify_line, BuildProgressState, OutputEvent};
use crate::{CommandExecutionResult, CommandRequest, CommandRunner, SupervisorError};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use redeploy_core::{LogLevel, Logger, SharedLogger};
use regex::Regex;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

static SERVICE_BUILT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bservice\s+\S+\s+built\b").expect("service built regex is valid")
});

const SHELL: &str = "sh";
const OUTPUT_INDENT: usize = 2;

/// Decide whether a finished command succeeded.
///
/// Exit code 0 always succeeds. Compose builds are known to exit nonzero after
/// building every service, so a failed build still counts when stdout reports
/// `Service <name> Built`. Any other nonzero exit counts as success only when
/// stderr has no content.
pub fn classify_outcome(
    exit_code: i32,
    is_build: bool,
    stdout: &[String],
    stderr: &[String],
) -> bool {
    if exit_code == 0 {
        return true;
    }

    if is_build {
        return SERVICE_BUILT.is_match(&stdout.join("\n"));
    }

    stderr.iter().all(|line| line.trim().is_empty())
}

/// Runs shell commands, streaming their output to the operator
pub struct ProcessSupervisor {
    logger: SharedLogger,
}

impl ProcessSupervisor {
    pub fn new(logger: SharedLogger) -> Self {
        Self { logger }
    }

    pub async fn execute(
        &self,
        request: CommandRequest,
    ) -> Result<CommandExecutionResult, SupervisorError> {
        debug!(
            "Executing '{}' in {:?}",
            request.command, request.working_dir
        );
        if request.echo {
            self.logger
                .log(LogLevel::Progress, &format!("{}...", request.description), 1);
        }

        let mut command = Command::new(SHELL);
        command
            .arg("-c")
            .arg(&request.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| SupervisorError::Launch {
            command: request.command.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(SupervisorError::Launch {
                command: request.command.clone(),
                source: std::io::Error::other("output pipes were not captured"),
            });
        };

        let echo = request.echo;
        let stdout_logger = self.logger.clone();
        let stdout_task = tokio::spawn(async move {
            // Progress state lives and dies with this invocation
            let mut progress = BuildProgressState::default();
            let lines = drain_lines(stdout, |line| {
                if let Some(event) = classify_line(line, &mut progress) {
                    if echo {
                        display_event(stdout_logger.as_ref(), &event);
                    }
                }
            })
            .await;
            (lines, progress)
        });

        let stderr_logger = self.logger.clone();
        let stderr_task = tokio::spawn(async move {
            drain_lines(stderr, |line| {
                if echo && !line.trim().is_empty() {
                    stderr_logger.log(LogLevel::Info, line, OUTPUT_INDENT);
                }
            })
            .await
        });

        let status = child.wait().await.map_err(|source| SupervisorError::Wait {
            command: request.command.clone(),
            source,
        })?;

        let (stdout_lines, progress) =
            stdout_task.await.map_err(|e| SupervisorError::Drain {
                command: request.command.clone(),
                message: e.to_string(),
            })?;
        let stderr_lines = stderr_task.await.map_err(|e| SupervisorError::Drain {
            command: request.command.clone(),
            message: e.to_string(),
        })?;

        let exit_code = status.code().unwrap_or(-1);
        let success = classify_outcome(
            exit_code,
            request.is_build(),
            &stdout_lines,
            &stderr_lines,
        );

        debug!(
            "'{}' exited with {} (success: {}, last build step {}/{})",
            request.command, exit_code, success, progress.current_step, progress.total_steps
        );
        if exit_code != 0 && success {
            debug!(
                "Accepting nonzero exit of '{}' by output heuristic",
                request.command
            );
        }

        Ok(CommandExecutionResult {
            exit_code,
            stdout: stdout_lines,
            stderr: stderr_lines,
            success,
        })
    }
}

#[async_trait]
impl CommandRunner for ProcessSupervisor {
    async fn run(
        &self,
        request: CommandRequest,
    ) -> Result<CommandExecutionResult, SupervisorError> {
        self.execute(request).await
    }
}

/// Read a stream to the end, one line at a time, tolerating invalid UTF-8
async fn drain_lines<R, F>(reader: R, mut on_line: F) -> Vec<String>
where
    R: AsyncRead + Unpin,
    F: FnMut(&str),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut lines = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                on_line(&line);
                lines.push(line);
            }
            Err(e) => {
                warn!("Stopped reading command output: {}", e);
                break;
            }
        }
    }

    lines
}

fn display_event(logger: &dyn Logger, event: &OutputEvent) {
    match event {
        OutputEvent::BuildStep { percent, line, .. } => {
            logger.log(
                LogLevel::Progress,
                &format!("[{:>3.0}%] {}", percent, line),
                OUTPUT_INDENT,
            );
        }
        OutputEvent::LayerProgress {
            layer,
            action,
            percent,
            ..
        } => {
            logger.log(
                LogLevel::Progress,
                &format!("{} {}: {:.1}%", action, layer, percent),
                OUTPUT_INDENT,
            );
        }
        OutputEvent::BuildOutput(line) => {
            logger.log(LogLevel::Info, line, OUTPUT_INDENT + 1);
        }
        OutputEvent::Text(line) => {
            logger.log(LogLevel::Info, line, OUTPUT_INDENT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exit_zero_always_succeeds() {
        assert!(classify_outcome(0, false, &[], &lines(&["fatal: boom"])));
        assert!(classify_outcome(0, true, &[], &lines(&["error"])));
    }

    #[test]
    fn test_build_nonzero_with_built_service() {
        let stdout = lines(&["#12 exporting layers", " ✔ Service web  Built"]);
        assert!(classify_outcome(1, true, &stdout, &lines(&["warning"])));

        let stdout = lines(&["service WEB built"]);
        assert!(classify_outcome(17, true, &stdout, &[]));
    }

    #[test]
    fn test_build_nonzero_without_built_service() {
        let stdout = lines(&["Service web Failed"]);
        assert!(!classify_outcome(1, true, &stdout, &[]));
        assert!(!classify_outcome(1, true, &lines(&["Service web Building"]), &[]));
    }

    #[test]
    fn test_general_nonzero_uses_stderr() {
        assert!(classify_outcome(1, false, &lines(&["done"]), &[]));
        assert!(classify_outcome(1, false, &[], &lines(&["", "  "])));
        assert!(!classify_outcome(
            1,
            false,
            &[],
            &lines(&["Error response from daemon"])
        ));
    }

    #[test]
    fn test_general_nonzero_ignores_built_marker() {
        let stdout = lines(&["Service web Built"]);
        assert!(!classify_outcome(1, false, &stdout, &lines(&["oops"])));
    }
}
