//! Per-project command execution
//!
//! `ExecutionContext` owns the project's cache directory; `VcsOperation` and
//! `VenvOperation` layer the "clone if absent" and "create environment if
//! absent" preconditions on top of it.

pub mod context;
pub mod vcs;
pub mod venv;

pub use context::ExecutionContext;
pub use vcs::VcsOperation;
pub use venv::{VenvOperation, PIP};
