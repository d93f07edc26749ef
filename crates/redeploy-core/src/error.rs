//! Error taxonomy for a project update

use std::path::PathBuf;
use thiserror::Error;

/// Reason a project update stopped before reaching a terminal success.
///
/// Each variant maps to one stage of the lifecycle. Component errors are
/// converted into this type at the coordinator boundary, so nothing more
/// specific crosses into the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Source sync error: {0}")]
    SourceSync(String),

    #[error("Containers still running after stop: {}", .remaining.join(", "))]
    ContainersNotStopped { remaining: Vec<String> },

    #[error("Build error: {0}")]
    Build(String),

    #[error("Start error: {0}")]
    Start(String),

    #[error("Container daemon unavailable: {0}")]
    DaemonUnavailable(String),

    #[error("Project path not found: {}", .0.display())]
    ProjectPathNotFound(PathBuf),
}

impl UpdateError {
    /// Short stage label used in summaries
    pub fn stage(&self) -> &'static str {
        match self {
            UpdateError::Validation(_) => "validate",
            UpdateError::Backup(_) => "backup",
            UpdateError::SourceSync(_) => "sync",
            UpdateError::ContainersNotStopped { .. } => "stop",
            UpdateError::Build(_) => "build",
            UpdateError::Start(_) => "start",
            UpdateError::DaemonUnavailable(_) => "daemon",
            UpdateError::ProjectPathNotFound(_) => "path",
        }
    }
}

/// Result type alias for update operations
pub type UpdateResult<T> = Result<T, UpdateError>;
