use super::context::ExecutionContext;
use crate::errors::WorkerError;
use crate::external::{CommandOutput, Invocation};
use git2::Repository;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Runs git subcommands for a project, cloning its repository first when the
/// project directory does not hold a working tree yet.
pub struct VcsOperation {
    context: Arc<ExecutionContext>,
    url: String,
}

impl VcsOperation {
    pub fn new(context: Arc<ExecutionContext>, url: impl Into<String>) -> Self {
        Self {
            context,
            url: url.into(),
        }
    }

    pub async fn run(&self, args: &[&str]) -> Result<Vec<u8>, WorkerError> {
        self.ensure_cloned().await?;
        self.context.run("git", args, None).await
    }

    /// Like [`VcsOperation::run`], but a non-zero exit is returned rather than
    /// raised. Used for subcommands that answer through their exit status.
    pub async fn output(&self, args: &[&str]) -> Result<CommandOutput, WorkerError> {
        self.ensure_cloned().await?;
        self.context.output("git", args).await
    }

    async fn ensure_cloned(&self) -> Result<(), WorkerError> {
        let projects_dir = self.context.ensure_projects_dir().await?;
        if has_working_tree(&self.context.project_dir()) {
            return Ok(());
        }

        let directory = self.context.project_id().to_string();
        debug!(url = %self.url, directory = %directory, "Cloning repository");
        self.context
            .execute(Invocation::new(
                "git",
                ["clone", self.url.as_str(), directory.as_str()],
                projects_dir,
            ))
            .await?;
        Ok(())
    }
}

fn has_working_tree(dir: &Path) -> bool {
    Repository::open(dir)
        .map(|repo| !repo.is_bare())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::external::ScriptedExecutor;

    fn context(root: &Path, executor: Arc<ScriptedExecutor>) -> Arc<ExecutionContext> {
        let cache = CacheConfig {
            root_path: root.to_path_buf(),
            directory_name: "cache".to_string(),
        };
        Arc::new(ExecutionContext::new(&cache, 5, executor))
    }

    #[tokio::test]
    async fn test_clones_before_first_command_when_absent() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let vcs = VcsOperation::new(context(root.path(), executor.clone()), "https://x/y.git");

        vcs.run(&["status"]).await.unwrap();

        let invocations = executor.invocations();
        assert_eq!(invocations[0].args, ["clone", "https://x/y.git", "5"]);
        assert_eq!(invocations[0].cwd, root.path().join("cache"));
        assert_eq!(invocations[1].args, ["status"]);
        assert_eq!(invocations[1].cwd, root.path().join("cache/5"));
    }

    #[tokio::test]
    async fn test_skips_clone_when_working_tree_exists() {
        let root = tempfile::tempdir().unwrap();
        Repository::init(root.path().join("cache/5")).unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let vcs = VcsOperation::new(context(root.path(), executor.clone()), "https://x/y.git");

        vcs.run(&["pull"]).await.unwrap();

        assert!(!executor.ran("git", &["clone"]));
        assert_eq!(executor.invocations().len(), 1);
    }

    #[tokio::test]
    async fn test_output_reports_non_zero_exit() {
        let root = tempfile::tempdir().unwrap();
        Repository::init(root.path().join("cache/5")).unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on(
            "git",
            &["diff", "--cached", "--quiet"],
            Ok(ScriptedExecutor::exit(1, "")),
        ));
        let vcs = VcsOperation::new(context(root.path(), executor), "https://x/y.git");

        let output = vcs.output(&["diff", "--cached", "--quiet"]).await.unwrap();
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_failed_clone_propagates() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on(
            "git",
            &["clone"],
            Ok(ScriptedExecutor::exit(128, "repository not found")),
        ));
        let vcs = VcsOperation::new(context(root.path(), executor.clone()), "https://x/y.git");

        let err = vcs.run(&["status"]).await.unwrap_err();
        assert!(matches!(err, WorkerError::CommandFailed { status_code: 128, .. }));
        assert!(!executor.ran("git", &["status"]));
    }
}
