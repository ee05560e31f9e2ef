use crate::config::GitConfig;
use crate::errors::WorkerError;
use crate::execution::VcsOperation;
use crate::models::RepositoryDescriptor;
use std::sync::Arc;
use tracing::debug;

/// Brings the project's clone to a clean, current state, synchronizing a fork
/// with its upstream when one is configured.
pub struct RepositoryCloner {
    vcs: Arc<VcsOperation>,
    git: GitConfig,
}

impl RepositoryCloner {
    pub fn new(vcs: Arc<VcsOperation>, git: GitConfig) -> Self {
        Self { vcs, git }
    }

    pub async fn clone_repository(&self, repository: &RepositoryDescriptor) -> Result<(), WorkerError> {
        debug!("Resetting working tree");
        self.vcs.run(&["reset", "--hard"]).await?;
        debug!("Removing untracked files");
        self.vcs.run(&["clean", "-fd"]).await?;
        debug!("Pulling latest changes");
        self.vcs.run(&["pull"]).await?;

        if let Some(upstream_url) = repository.upstream_url.as_deref().filter(|url| !url.is_empty()) {
            self.sync_upstream(upstream_url).await?;
        }
        Ok(())
    }

    async fn sync_upstream(&self, upstream_url: &str) -> Result<(), WorkerError> {
        let remote = self.git.upstream_remote.as_str();
        let remotes = self.vcs.run(&["remote"]).await?;
        let known = String::from_utf8_lossy(&remotes)
            .lines()
            .any(|line| line.trim() == remote);
        if !known {
            debug!(remote, url = upstream_url, "Adding upstream remote");
            self.vcs.run(&["remote", "add", remote, upstream_url]).await?;
        }

        debug!(remote, "Synchronizing fork with upstream");
        self.vcs.run(&["fetch", remote]).await?;
        let upstream_branch = format!("{remote}/{}", self.git.branch);
        self.vcs.run(&["merge", upstream_branch.as_str()]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::execution::ExecutionContext;
    use crate::external::ScriptedExecutor;
    use crate::models::{fixtures, Flavor};

    fn cloner(root: &std::path::Path, executor: Arc<ScriptedExecutor>) -> RepositoryCloner {
        git2::Repository::init(root.join("cache/7")).unwrap();
        let cache = CacheConfig {
            root_path: root.to_path_buf(),
            directory_name: "cache".to_string(),
        };
        let context = Arc::new(ExecutionContext::new(&cache, 7, executor));
        let vcs = Arc::new(VcsOperation::new(context, "https://example.com/sample.git"));
        RepositoryCloner::new(vcs, GitConfig::default())
    }

    fn git_args(executor: &ScriptedExecutor) -> Vec<String> {
        executor
            .invocations()
            .iter()
            .map(|i| i.args.join(" "))
            .collect()
    }

    #[tokio::test]
    async fn test_refresh_without_upstream() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let project = fixtures::project(Flavor::Git, vec![]);

        cloner(root.path(), executor.clone())
            .clone_repository(&project.repository)
            .await
            .unwrap();

        assert_eq!(git_args(&executor), ["reset --hard", "clean -fd", "pull"]);
    }

    #[tokio::test]
    async fn test_upstream_remote_is_added_and_merged() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on(
            "git",
            &["remote"],
            Ok(ScriptedExecutor::ok("origin\n")),
        ));
        let mut project = fixtures::project(Flavor::Git, vec![]);
        project.repository.upstream_url = Some("https://example.com/upstream.git".to_string());

        cloner(root.path(), executor.clone())
            .clone_repository(&project.repository)
            .await
            .unwrap();

        let args = git_args(&executor);
        assert!(args.contains(&"remote add upstream https://example.com/upstream.git".to_string()));
        assert!(args.contains(&"fetch upstream".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("merge upstream/master"));
    }

    #[tokio::test]
    async fn test_known_upstream_remote_is_not_re_added() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new().on(
            "git",
            &["remote"],
            Ok(ScriptedExecutor::ok("origin\nupstream\n")),
        ));
        let mut project = fixtures::project(Flavor::Git, vec![]);
        project.repository.upstream_url = Some("https://example.com/upstream.git".to_string());

        cloner(root.path(), executor.clone())
            .clone_repository(&project.repository)
            .await
            .unwrap();

        assert!(!executor.ran("git", &["remote", "add"]));
    }
}
