//! External tool abstractions
//!
//! Trait-based abstraction over process execution, so that git, the package
//! installer and the project's self-check run behind one injectable seam.

pub mod command;
#[cfg(any(test, feature = "testing"))]
pub mod scripted;

pub use command::{CommandError, CommandExecutor, CommandOutput, Invocation, ProcessCommandExecutor};
#[cfg(any(test, feature = "testing"))]
pub use scripted::ScriptedExecutor;
