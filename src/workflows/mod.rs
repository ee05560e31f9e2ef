// Update workflow orchestration: the transition table and the engine driving it

pub mod engine;
pub mod state_machine;

pub use engine::{roll_back, RunReport, RunState, StateNotifier, WorkflowEngine};
pub use state_machine::{
    StateMachine, TransitionError, TransitionRecord, TransitionTable, Trigger, WorkflowState,
};
