// depwatch - dependency update worker
// Clones a project, proposes newer package versions, validates them with the
// project's own check command and publishes the change.

pub mod config;
pub mod errors;
pub mod execution;
pub mod external;
pub mod github;
pub mod manifest;
pub mod models;
pub mod operations;
pub mod telemetry;
pub mod workflows;

// Re-export key types for easy access
pub use config::WorkerConfig;
pub use errors::{RequestError, WorkerError};
pub use execution::{ExecutionContext, VcsOperation, VenvOperation};
pub use external::{CommandExecutor, Invocation, ProcessCommandExecutor};
#[cfg(any(test, feature = "testing"))]
pub use external::ScriptedExecutor;
pub use github::GitHubClient;
pub use models::{Flavor, PackageUpdateSuggestion, Project, Requirement, RequirementsFile};
pub use operations::{FailurePolicy, Operation, ProjectOperations, WorkflowOperations};
pub use telemetry::{create_run_span, generate_correlation_id, init_telemetry};
pub use workflows::{RunReport, StateNotifier, WorkflowEngine, WorkflowState};
