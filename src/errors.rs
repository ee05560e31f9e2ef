use crate::external::CommandError;
use crate::workflows::state_machine::TransitionError;
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by any workflow operation.
///
/// Operations propagate these unmodified; the workflow engine is the only
/// place that turns them into a `Failure` state.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Command `{command}` exited with status {status_code}: {stderr}")]
    CommandFailed {
        command: String,
        status_code: i32,
        stderr: String,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Requirements file not found: {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Persistence API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error: {0}")]
    GitHub(#[from] octocrab::Error),

    #[error("Repository is missing GitHub setting `{field}`")]
    GitHubSettingsMissing { field: &'static str },

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl WorkerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorkerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Error decoding an inbound processing request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Malformed processing request: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_message_includes_stderr() {
        let err = WorkerError::CommandFailed {
            command: "git push origin master".to_string(),
            status_code: 128,
            stderr: "remote rejected".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("git push origin master"));
        assert!(message.contains("128"));
        assert!(message.contains("remote rejected"));
    }

    #[test]
    fn test_manifest_not_found_shows_path() {
        let err = WorkerError::ManifestNotFound {
            path: PathBuf::from("/cache/7/requirements.txt"),
        };
        assert!(err.to_string().contains("/cache/7/requirements.txt"));
    }
}
