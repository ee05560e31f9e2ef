use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkflowState {
    Initializing,
    CloningRepository,
    ParsingRequirements,
    CheckingForUpdates,
    UpdatingMetadata,
    AttemptingUpdate,
    CommittingChanges,
    PushingChanges,
    Success,
    Failure,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 10] = [
        WorkflowState::Initializing,
        WorkflowState::CloningRepository,
        WorkflowState::ParsingRequirements,
        WorkflowState::CheckingForUpdates,
        WorkflowState::UpdatingMetadata,
        WorkflowState::AttemptingUpdate,
        WorkflowState::CommittingChanges,
        WorkflowState::PushingChanges,
        WorkflowState::Success,
        WorkflowState::Failure,
    ];

    /// Name reported to the state notifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Initializing => "Initializing",
            WorkflowState::CloningRepository => "CloningRepository",
            WorkflowState::ParsingRequirements => "ParsingRequirements",
            WorkflowState::CheckingForUpdates => "CheckingForUpdates",
            WorkflowState::UpdatingMetadata => "UpdatingMetadata",
            WorkflowState::AttemptingUpdate => "AttemptingUpdate",
            WorkflowState::CommittingChanges => "CommittingChanges",
            WorkflowState::PushingChanges => "PushingChanges",
            WorkflowState::Success => "Success",
            WorkflowState::Failure => "Failure",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Success | WorkflowState::Failure)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Trigger {
    ToClone,
    ToParse,
    ToCheck,
    ToUpdateMetadata,
    ToAttemptUpdate,
    ToCommit,
    ToPush,
    ToSuccess,
    ToFail,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("Trigger {trigger} is not legal from state {from}")]
    IllegalTransition {
        trigger: Trigger,
        from: WorkflowState,
    },
    #[error("Invalid transition table: {reason}")]
    InvalidTable { reason: String },
}

/// Legal `(trigger, source) -> destination` pairs.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    edges: HashMap<(Trigger, WorkflowState), WorkflowState>,
}

impl TransitionTable {
    /// Build a table from `(trigger, sources, destination)` rows.
    ///
    /// Rejects duplicate `(trigger, source)` pairs, transitions out of a
    /// terminal state and states unreachable from `Initializing`.
    pub fn new(rows: &[(Trigger, &[WorkflowState], WorkflowState)]) -> Result<Self, TransitionError> {
        let mut edges = HashMap::new();
        for (trigger, sources, destination) in rows {
            for source in sources.iter() {
                if source.is_terminal() {
                    return Err(TransitionError::InvalidTable {
                        reason: format!("{trigger} leaves terminal state {source}"),
                    });
                }
                if edges.insert((*trigger, *source), *destination).is_some() {
                    return Err(TransitionError::InvalidTable {
                        reason: format!("{trigger} from {source} is declared twice"),
                    });
                }
            }
        }

        let table = Self { edges };
        if let Some(state) = table.unreachable_states().into_iter().next() {
            return Err(TransitionError::InvalidTable {
                reason: format!("{state} is unreachable"),
            });
        }
        Ok(table)
    }

    /// The update workflow: clone, parse, check, report, then optionally
    /// attempt, commit, push and report again. `Failure` is reachable from
    /// every non-terminal state.
    pub fn update_workflow() -> Result<Self, TransitionError> {
        use WorkflowState::*;

        let failing_sources: Vec<WorkflowState> = WorkflowState::ALL
            .into_iter()
            .filter(|state| !state.is_terminal())
            .collect();

        Self::new(&[
            (Trigger::ToClone, &[Initializing], CloningRepository),
            (Trigger::ToParse, &[CloningRepository], ParsingRequirements),
            (Trigger::ToCheck, &[ParsingRequirements], CheckingForUpdates),
            (Trigger::ToUpdateMetadata, &[CheckingForUpdates, PushingChanges], UpdatingMetadata),
            (Trigger::ToAttemptUpdate, &[UpdatingMetadata], AttemptingUpdate),
            (Trigger::ToCommit, &[AttemptingUpdate], CommittingChanges),
            (Trigger::ToPush, &[CommittingChanges], PushingChanges),
            (Trigger::ToSuccess, &[UpdatingMetadata], Success),
            (Trigger::ToFail, failing_sources.as_slice(), Failure),
        ])
    }

    pub fn destination(&self, trigger: Trigger, from: WorkflowState) -> Option<WorkflowState> {
        self.edges.get(&(trigger, from)).copied()
    }

    fn unreachable_states(&self) -> Vec<WorkflowState> {
        let mut seen = HashSet::from([WorkflowState::Initializing]);
        let mut queue = VecDeque::from([WorkflowState::Initializing]);
        while let Some(state) = queue.pop_front() {
            for ((_, source), destination) in &self.edges {
                if *source == state && seen.insert(*destination) {
                    queue.push_back(*destination);
                }
            }
        }

        WorkflowState::ALL
            .into_iter()
            .filter(|state| !seen.contains(state))
            .collect()
    }
}

/// One transition taken during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: WorkflowState,
    pub trigger: Trigger,
    pub to: WorkflowState,
    pub at: DateTime<Utc>,
}

/// Current state of a single run plus the transitions taken so far.
#[derive(Debug)]
pub struct StateMachine<'a> {
    table: &'a TransitionTable,
    state: WorkflowState,
    history: Vec<TransitionRecord>,
}

impl<'a> StateMachine<'a> {
    pub fn new(table: &'a TransitionTable) -> Self {
        Self {
            table,
            state: WorkflowState::Initializing,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn into_history(self) -> Vec<TransitionRecord> {
        self.history
    }

    /// Fire `trigger` and return the new state. An illegal trigger leaves the
    /// state unchanged.
    pub fn fire(&mut self, trigger: Trigger) -> Result<WorkflowState, TransitionError> {
        let from = self.state;
        let to = self
            .table
            .destination(trigger, from)
            .ok_or(TransitionError::IllegalTransition { trigger, from })?;

        self.history.push(TransitionRecord {
            from,
            trigger,
            to,
            at: Utc::now(),
        });
        self.state = to;
        Ok(to)
    }
}
