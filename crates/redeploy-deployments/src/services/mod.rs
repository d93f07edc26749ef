mod coordinator;
mod inspector;
mod orchestrator;
mod status;

pub use coordinator::{ContainerLifecycleCoordinator, StopEscalationAttempt, StopLevel};
pub use inspector::{
    ComposeVariant, InspectError, ProjectDescriptor, ProjectInspector, ENV_FILE_NAME,
};
pub use orchestrator::{DaemonGate, UpdateOrchestrator, COMPLETION_MESSAGE};
pub use status::StatusReporter;
