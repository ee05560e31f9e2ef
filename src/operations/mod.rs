//! The named operations the workflow engine sequences.
//!
//! Each operation is a small struct over the execution layer. The
//! [`WorkflowOperations`] trait is the seam the engine drives, and
//! [`ProjectOperations`] is its production implementation.

pub mod attempt;
pub mod check;
pub mod clone;
pub mod parse;
pub mod publish;
pub mod report;

pub use attempt::UpdateAttempter;
pub use check::UpdateChecker;
pub use clone::RepositoryCloner;
pub use parse::ManifestParser;
pub use publish::{ChangePublisher, ChangePublishing};
pub use report::MetadataReporter;

use crate::config::WorkerConfig;
use crate::errors::WorkerError;
use crate::execution::{ExecutionContext, VcsOperation, VenvOperation};
use crate::external::CommandExecutor;
use crate::models::{PackageUpdateSuggestion, Project};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// How a failure inside an operation is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The error reaches the engine, which routes the run to `Failure`.
    Propagate,
    /// The error is logged and the operation reports that nothing is outdated.
    TreatAsNoUpdates,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CloneRepository,
    ParseRequirements,
    CheckUpdates,
    AttemptUpdate,
    CommitChanges,
    PushChanges,
    UpdateMetadata,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::CloneRepository,
        Operation::ParseRequirements,
        Operation::CheckUpdates,
        Operation::AttemptUpdate,
        Operation::CommitChanges,
        Operation::PushChanges,
        Operation::UpdateMetadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CloneRepository => "clone_repository",
            Operation::ParseRequirements => "parse_requirements",
            Operation::CheckUpdates => "check_updates",
            Operation::AttemptUpdate => "attempt_update",
            Operation::CommitChanges => "commit_changes",
            Operation::PushChanges => "push_changes",
            Operation::UpdateMetadata => "update_metadata",
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Operation::CheckUpdates => FailurePolicy::TreatAsNoUpdates,
            Operation::CloneRepository
            | Operation::ParseRequirements
            | Operation::AttemptUpdate
            | Operation::CommitChanges
            | Operation::PushChanges
            | Operation::UpdateMetadata => FailurePolicy::Propagate,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operations a workflow run sequences, in the order the engine calls them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowOperations: Send + Sync {
    async fn clone_repository(&self, project: &Project) -> Result<(), WorkerError>;

    async fn parse_requirements(&self, project: &mut Project) -> Result<(), WorkerError>;

    /// Never fails: see [`FailurePolicy::TreatAsNoUpdates`].
    async fn check_updates(&self, project: &mut Project) -> Vec<PackageUpdateSuggestion>;

    async fn attempt_update(&self, project: &Project) -> Result<(), WorkerError>;

    /// Returns `false` when there was nothing to commit.
    async fn commit_changes(&self, project: &Project) -> Result<bool, WorkerError>;

    async fn push_changes(&self, project: &Project) -> Result<(), WorkerError>;

    async fn update_metadata(&self, project: &Project) -> Result<(), WorkerError>;
}

/// Operations backed by real processes, the filesystem and HTTP.
pub struct ProjectOperations {
    cloner: RepositoryCloner,
    parser: ManifestParser,
    checker: UpdateChecker,
    attempter: UpdateAttempter,
    publishing: ChangePublishing,
    reporter: MetadataReporter,
}

impl ProjectOperations {
    pub fn new(
        config: &WorkerConfig,
        project: &Project,
        executor: Arc<dyn CommandExecutor>,
    ) -> Result<Self, WorkerError> {
        let context = Arc::new(ExecutionContext::new(&config.cache, project.id, executor));
        let vcs = Arc::new(VcsOperation::new(context.clone(), project.repository.url.clone()));
        let venv = Arc::new(VenvOperation::new(context.clone(), config.venv.clone()));
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            cloner: RepositoryCloner::new(vcs.clone(), config.git.clone()),
            parser: ManifestParser::new(context.clone()),
            checker: UpdateChecker::new(venv.clone()),
            attempter: UpdateAttempter::new(context, venv.clone()),
            publishing: ChangePublishing::new(
                project.repository.flavor,
                vcs,
                venv,
                config.git.clone(),
                config.github.clone(),
            ),
            reporter: MetadataReporter::new(client, config.api.address.clone()),
        })
    }
}

#[async_trait]
impl WorkflowOperations for ProjectOperations {
    async fn clone_repository(&self, project: &Project) -> Result<(), WorkerError> {
        self.cloner.clone_repository(&project.repository).await
    }

    async fn parse_requirements(&self, project: &mut Project) -> Result<(), WorkerError> {
        self.parser.parse(project).await
    }

    async fn check_updates(&self, project: &mut Project) -> Vec<PackageUpdateSuggestion> {
        self.checker.check(project).await
    }

    async fn attempt_update(&self, project: &Project) -> Result<(), WorkerError> {
        self.attempter.attempt(project).await
    }

    async fn commit_changes(&self, project: &Project) -> Result<bool, WorkerError> {
        self.publishing.commit(project).await
    }

    async fn push_changes(&self, project: &Project) -> Result<(), WorkerError> {
        self.publishing.publish(project).await
    }

    async fn update_metadata(&self, project: &Project) -> Result<(), WorkerError> {
        self.reporter.update_metadata(project).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_update_check_neutralizes_failures() {
        let neutralizing: Vec<Operation> = Operation::ALL
            .into_iter()
            .filter(|operation| operation.failure_policy() == FailurePolicy::TreatAsNoUpdates)
            .collect();
        assert_eq!(neutralizing, vec![Operation::CheckUpdates]);
    }

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::AttemptUpdate.to_string(), "attempt_update");
        assert_eq!(Operation::UpdateMetadata.as_str(), "update_metadata");
    }
}
