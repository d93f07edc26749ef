//! Shared result types for update runs

use crate::UpdateError;
use std::fmt;
use std::path::PathBuf;

/// Terminal success state of one project update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOutcome {
    /// Stack was stopped, rebuilt and restarted
    Updated,
    /// Checkout was already current and the operator declined a rebuild
    Unchanged,
}

impl fmt::Display for ProjectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectOutcome::Updated => write!(f, "updated"),
            ProjectOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of running one project through the coordinator
#[derive(Debug, Clone)]
pub struct ProjectReport {
    pub path: PathBuf,
    pub name: String,
    pub result: Result<ProjectOutcome, UpdateError>,
}

impl ProjectReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything one orchestrator run did
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<ProjectReport>,
    /// Set when the run ended early (daemon gate declined or operator stopped)
    pub aborted: Option<UpdateError>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.aborted.is_none() && self.failed() == 0
    }
}
