//! Command lines used by an update
//!
//! Everything runs through `sh -c` inside the project directory, so compose
//! commands name the descriptor explicitly and git commands act on the
//! checkout in the working directory.

use redeploy_core::shell_quote;

/// Probe used to decide whether the Docker daemon is reachable
pub const DOCKER_INFO: &str = "docker info";

pub const GIT_FETCH_ALL: &str = "git fetch --all";
/// Branch status against the fetched upstream, forced to the C locale so the
/// status text can be matched literally
pub const GIT_BRANCH_STATUS: &str = "LC_ALL=C git status -uno";
pub const GIT_PULL: &str = "git pull";

/// Substring of the branch status reported when nothing needs pulling
pub const BRANCH_UP_TO_DATE: &str = "Your branch is up to date";

/// Stop a single container by id, bypassing compose
pub fn docker_stop(container_id: &str) -> String {
    format!("docker stop {}", shell_quote(container_id))
}

/// `docker compose` invocations bound to one descriptor file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommands {
    descriptor: String,
}

impl ComposeCommands {
    pub fn new(descriptor_file_name: impl Into<String>) -> Self {
        Self {
            descriptor: descriptor_file_name.into(),
        }
    }

    fn compose(&self, args: &str) -> String {
        format!("docker compose -f {} {}", shell_quote(&self.descriptor), args)
    }

    /// Ids of running or restarting containers, one per line
    pub fn running_containers(&self) -> String {
        self.compose("ps -q --status running --status restarting")
    }

    pub fn stop_graceful(&self, timeout_secs: u64) -> String {
        self.compose(&format!("down --timeout {}", timeout_secs))
    }

    /// Stop and remove locally built images, volumes and orphan containers
    pub fn stop_forced(&self) -> String {
        self.compose("down --rmi local --volumes --remove-orphans")
    }

    pub fn build(&self) -> String {
        self.compose("build --no-cache --pull")
    }

    pub fn start(&self) -> String {
        self.compose("up -d")
    }

    pub fn status(&self) -> String {
        self.compose("ps")
    }

    pub fn logs_tail(&self, lines: usize) -> String {
        self.compose(&format!("logs --tail {}", lines))
    }
}
