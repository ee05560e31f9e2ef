use super::state_machine::{StateMachine, TransitionRecord, TransitionTable, Trigger, WorkflowState};
use crate::config::RunConfig;
use crate::errors::WorkerError;
use crate::models::{Project, RequirementId};
use crate::operations::{Operation, WorkflowOperations};
use crate::telemetry;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn, Instrument};

/// Receives the name of every state the run enters, `Failure` included.
///
/// Delivery is fire-and-forget: the engine neither waits on nor retries it.
pub trait StateNotifier: Send + Sync {
    fn notify(&self, state: &str);
}

impl<F> StateNotifier for F
where
    F: Fn(&str) + Send + Sync,
{
    fn notify(&self, state: &str) {
        self(state)
    }
}

/// Volatile state of one run, discarded when the run ends.
pub struct RunState<'a> {
    pub machine: StateMachine<'a>,
    pub should_attempt_update: bool,
    pub update_successful: bool,
    /// Requirements whose desired version was already set when the run began.
    pub locked: HashSet<RequirementId>,
}

impl<'a> RunState<'a> {
    pub fn new(table: &'a TransitionTable, project: &Project) -> Self {
        Self {
            machine: StateMachine::new(table),
            should_attempt_update: false,
            update_successful: false,
            locked: project.locked_requirement_ids(),
        }
    }

    fn into_report(self) -> RunReport {
        RunReport {
            final_state: self.machine.state(),
            should_attempt_update: self.should_attempt_update,
            update_successful: self.update_successful,
            transitions: self.machine.into_history(),
        }
    }
}

/// Outcome of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub final_state: WorkflowState,
    pub should_attempt_update: bool,
    pub update_successful: bool,
    pub transitions: Vec<TransitionRecord>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.final_state == WorkflowState::Success
    }

    /// Every state entered after `Initializing`, in order.
    pub fn visited_states(&self) -> Vec<WorkflowState> {
        self.transitions.iter().map(|record| record.to).collect()
    }
}

/// Clear the desired version of every requirement not in `locked`.
pub fn roll_back(project: &mut Project, locked: &HashSet<RequirementId>) {
    for requirement in project.requirements_mut() {
        let is_locked = requirement.id.is_some_and(|id| locked.contains(&id));
        if !is_locked && !requirement.desired_version.is_empty() {
            debug!(
                package = %requirement.name,
                desired = %requirement.desired_version,
                "Rolling back desired version"
            );
            requirement.desired_version.clear();
        }
    }
}

/// Drives the named operations through the update workflow state machine.
pub struct WorkflowEngine<O> {
    operations: O,
    notifier: Arc<dyn StateNotifier>,
    table: TransitionTable,
    dry_run: bool,
}

impl<O: WorkflowOperations> WorkflowEngine<O> {
    pub fn new(
        operations: O,
        run_config: &RunConfig,
        notifier: Arc<dyn StateNotifier>,
    ) -> Result<Self, WorkerError> {
        Ok(Self {
            operations,
            notifier,
            table: TransitionTable::update_workflow()?,
            dry_run: run_config.dry_run,
        })
    }

    /// Run the workflow for `project`. Never fails: errors route the run to
    /// `Failure`, which the report reflects.
    pub async fn run(&self, project: &mut Project) -> RunReport {
        let correlation_id = telemetry::generate_correlation_id();
        let span = telemetry::create_run_span(project, &correlation_id);
        self.execute(project).instrument(span).await
    }

    async fn execute(&self, project: &mut Project) -> RunReport {
        let mut run = RunState::new(&self.table, project);
        debug!(locked = run.locked.len(), "Changing state to {}", run.machine.state());
        self.notifier.notify(run.machine.state().as_str());

        match self.drive(&mut run, project).await {
            Ok(()) => info!("Workflow run succeeded"),
            Err(err) => {
                error!(error = %err, state = %run.machine.state(), "Workflow run failed");
                self.fail(&mut run);
            }
        }

        run.into_report()
    }

    async fn drive(&self, run: &mut RunState<'_>, project: &mut Project) -> Result<(), WorkerError> {
        self.transition(run, Trigger::ToClone)?;
        self.operations.clone_repository(project).await?;

        self.transition(run, Trigger::ToParse)?;
        self.operations.parse_requirements(project).await?;

        self.transition(run, Trigger::ToCheck)?;
        let suggestions = self.operations.check_updates(project).await;
        run.should_attempt_update = !suggestions.is_empty();
        debug!(
            suggestions = suggestions.len(),
            policy = ?Operation::CheckUpdates.failure_policy(),
            "Update check finished"
        );

        self.transition(run, Trigger::ToUpdateMetadata)?;
        self.operations.update_metadata(project).await?;

        if run.should_attempt_update {
            self.attempt(run, project).await?;
        }

        if run.update_successful {
            self.publish(run, project).await?;
        }

        self.transition(run, Trigger::ToSuccess)?;
        Ok(())
    }

    async fn attempt(&self, run: &mut RunState<'_>, project: &mut Project) -> Result<(), WorkerError> {
        self.transition(run, Trigger::ToAttemptUpdate)?;

        match self.operations.attempt_update(project).await {
            Ok(()) => {
                run.update_successful = true;
                debug!("Re-parsing rewritten requirements");
                self.operations.parse_requirements(project).await
            }
            Err(err) => {
                run.update_successful = false;
                warn!(error = %err, "Update attempt failed, rolling back proposed versions");
                roll_back(project, &run.locked);
                Err(err)
            }
        }
    }

    async fn publish(&self, run: &mut RunState<'_>, project: &mut Project) -> Result<(), WorkerError> {
        self.transition(run, Trigger::ToCommit)?;
        let committed = if self.skipped(Operation::CommitChanges) {
            debug!("Dry run: not committing");
            false
        } else {
            self.operations.commit_changes(project).await?
        };

        self.transition(run, Trigger::ToPush)?;
        if self.skipped(Operation::PushChanges) {
            debug!("Dry run: not publishing");
        } else if !committed {
            debug!("Nothing committed, not publishing");
        } else {
            self.operations.push_changes(project).await?;
        }

        self.transition(run, Trigger::ToUpdateMetadata)?;
        if self.skipped(Operation::UpdateMetadata) {
            debug!("Dry run: not reporting final metadata");
        } else {
            self.operations.update_metadata(project).await?;
        }
        Ok(())
    }

    fn skipped(&self, operation: Operation) -> bool {
        if self.dry_run {
            info!(operation = %operation, "Skipping operation in dry-run mode");
        }
        self.dry_run
    }

    fn transition(&self, run: &mut RunState<'_>, trigger: Trigger) -> Result<(), WorkerError> {
        let state = run.machine.fire(trigger).map_err(|err| {
            error!(error = %err, "Illegal workflow transition");
            err
        })?;
        debug!("Changing state to {}", state);
        self.notifier.notify(state.as_str());
        Ok(())
    }

    fn fail(&self, run: &mut RunState<'_>) {
        match run.machine.fire(Trigger::ToFail) {
            Ok(state) => {
                debug!("Changing state to {}", state);
                self.notifier.notify(state.as_str());
            }
            Err(err) => error!(error = %err, "Unable to enter failure state"),
        }
    }
}
