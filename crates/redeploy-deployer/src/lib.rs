//! Redeploy Deployer - supervised execution of docker and git commands
//!
//! This crate provides:
//! - A process supervisor that drains stdout/stderr concurrently and decides
//!   success with a lenient heuristic
//! - Classification of build/pull output into progress events
//! - The catalogue of compose, docker and git command lines used by an update
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub mod commands;
pub mod output;
pub mod size;
pub mod supervisor;

pub use commands::ComposeCommands;
pub use output::{classify_line, percent_of, BuildProgressState, LayerAction, OutputEvent};
pub use size::parse_size;
pub use supervisor::{classify_outcome, ProcessSupervisor};

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Failed to launch '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for '{command}': {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Output reader for '{command}' aborted: {message}")]
    Drain { command: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    #[default]
    General,
    /// Image builds; a nonzero exit is forgiven when stdout reports built services
    Build,
}

/// One command to run through a shell
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: String,
    pub description: String,
    pub working_dir: Option<PathBuf>,
    pub kind: CommandKind,
    /// Display output to the operator while it arrives
    pub echo: bool,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
            working_dir: None,
            kind: CommandKind::General,
            echo: true,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn build(mut self) -> Self {
        self.kind = CommandKind::Build;
        self
    }

    /// Capture output without displaying it
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    pub fn is_build(&self) -> bool {
        self.kind == CommandKind::Build
    }
}

/// Outcome of one supervised command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExecutionResult {
    /// Process exit code; -1 when terminated by a signal
    pub exit_code: i32,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub success: bool,
}

impl CommandExecutionResult {
    /// Non-blank stdout lines, trimmed
    pub fn stdout_values(&self) -> Vec<String> {
        self.stdout
            .iter()
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn stdout_text(&self) -> String {
        self.stdout.join("\n")
    }
}

/// Anything able to run a [`CommandRequest`]
///
/// [`ProcessSupervisor`] is the real implementation; the lifecycle code only
/// depends on this trait so it can be driven by scripted runners.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(
        &self,
        request: CommandRequest,
    ) -> Result<CommandExecutionResult, SupervisorError>;
}

pub type SharedRunner = Arc<dyn CommandRunner>;
