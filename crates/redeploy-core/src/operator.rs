//! Operator decisions
//!
//! Every question the update flow asks a human goes through [`Operator`], so a
//! terminal, a fixed policy, or a test script can answer it.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A yes/no question raised during an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorPrompt {
    /// The checkout is already current; rebuild the stack anyway?
    RebuildWithoutUpdate { project: String },
    /// A project failed; keep going with the remaining ones?
    ContinueAfterFailure { project: String },
    /// The container daemon is unreachable; probe again?
    RetryDaemon,
}

impl OperatorPrompt {
    pub fn question(&self) -> String {
        match self {
            OperatorPrompt::RebuildWithoutUpdate { project } => format!(
                "{} is already up to date. Rebuild and restart it anyway?",
                project
            ),
            OperatorPrompt::ContinueAfterFailure { project } => format!(
                "Updating {} failed. Continue with the remaining projects?",
                project
            ),
            OperatorPrompt::RetryDaemon => {
                "The Docker daemon is not reachable. Try again?".to_string()
            }
        }
    }

    /// Answer used when the operator just presses enter
    pub fn default_answer(&self) -> bool {
        false
    }
}

impl fmt::Display for OperatorPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.question())
    }
}

#[async_trait]
pub trait Operator: Send + Sync {
    /// Ask a yes/no question, blocking the calling stage until answered
    async fn confirm(&self, prompt: &OperatorPrompt) -> bool;

    /// Show a final message and wait until the operator acknowledges it
    async fn acknowledge(&self, message: &str);
}

pub type SharedOperator = Arc<dyn Operator>;

/// Non-interactive operator answering from a fixed policy
///
/// Never asks to re-probe the daemon: the daemon gate has no retry bound, so
/// an unattended "yes" there would spin forever.
#[derive(Debug, Clone, Copy)]
pub struct AutoOperator {
    assume_yes: bool,
}

impl AutoOperator {
    /// Answer "yes" to rebuild and continue prompts
    pub fn assume_yes() -> Self {
        Self { assume_yes: true }
    }

    /// Answer every prompt with its default
    pub fn defaults() -> Self {
        Self { assume_yes: false }
    }
}

#[async_trait]
impl Operator for AutoOperator {
    async fn confirm(&self, prompt: &OperatorPrompt) -> bool {
        match prompt {
            OperatorPrompt::RetryDaemon => false,
            _ if self.assume_yes => true,
            _ => prompt.default_answer(),
        }
    }

    async fn acknowledge(&self, _message: &str) {}
}
