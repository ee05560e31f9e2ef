use crate::config::{GitConfig, GitHubConfig};
use crate::errors::WorkerError;
use crate::execution::{VcsOperation, VenvOperation};
use crate::github::GitHubClient;
use crate::models::{Flavor, Project};
use std::sync::Arc;
use tracing::{debug, info};

/// How a validated change leaves the worker, selected by the repository flavor.
pub enum ChangePublisher {
    /// Commit and push straight to the configured remote branch.
    Git,
    /// Commit, push, then open a pull request on the hosting service.
    GitHub,
    /// Commit, then submit for review with `git-review`.
    Gerrit,
}

impl From<Flavor> for ChangePublisher {
    fn from(flavor: Flavor) -> Self {
        match flavor {
            Flavor::Git => ChangePublisher::Git,
            Flavor::GitHub => ChangePublisher::GitHub,
            Flavor::Gerrit => ChangePublisher::Gerrit,
        }
    }
}

/// Stages, commits and publishes the rewritten manifests.
pub struct ChangePublishing {
    publisher: ChangePublisher,
    vcs: Arc<VcsOperation>,
    venv: Arc<VenvOperation>,
    git: GitConfig,
    github: GitHubConfig,
}

impl ChangePublishing {
    pub fn new(
        flavor: Flavor,
        vcs: Arc<VcsOperation>,
        venv: Arc<VenvOperation>,
        git: GitConfig,
        github: GitHubConfig,
    ) -> Self {
        Self {
            publisher: flavor.into(),
            vcs,
            venv,
            git,
            github,
        }
    }

    /// Stage every manifest and commit them. Returns `false` without
    /// committing when staging left the index identical to `HEAD`.
    pub async fn commit(&self, project: &Project) -> Result<bool, WorkerError> {
        for requirements_file in &project.requirements_files {
            debug!(file = %requirements_file.path, "Staging requirements file");
            self.vcs.run(&["add", requirements_file.path.as_str()]).await?;
        }

        if !self.has_staged_changes().await? {
            debug!("Manifests already match HEAD, nothing to commit");
            return Ok(false);
        }

        debug!(message = %self.git.commit_message, "Committing changes");
        self.vcs
            .run(&["commit", "-m", self.git.commit_message.as_str()])
            .await?;
        Ok(true)
    }

    /// `git diff --cached --quiet` exits 1 when the index differs from `HEAD`.
    async fn has_staged_changes(&self) -> Result<bool, WorkerError> {
        let args = ["diff", "--cached", "--quiet"];
        let output = self.vcs.output(&args).await?;
        match output.status_code {
            0 => Ok(false),
            1 => Ok(true),
            status_code => Err(WorkerError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                status_code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }

    pub async fn publish(&self, project: &Project) -> Result<(), WorkerError> {
        match self.publisher {
            ChangePublisher::Git => self.push().await,
            ChangePublisher::GitHub => {
                self.push().await?;
                self.open_pull_request(project).await
            }
            ChangePublisher::Gerrit => {
                debug!("Submitting change for review");
                self.venv.run("git-review", &[]).await?;
                Ok(())
            }
        }
    }

    async fn push(&self) -> Result<(), WorkerError> {
        debug!(remote = %self.git.remote, branch = %self.git.branch, "Pushing changes");
        self.vcs
            .run(&["push", self.git.remote.as_str(), self.git.branch.as_str()])
            .await?;
        Ok(())
    }

    async fn open_pull_request(&self, project: &Project) -> Result<(), WorkerError> {
        let client = GitHubClient::for_repository(&project.repository, &self.github)?;
        let pr = client
            .pulls()
            .create_pull_request(
                &self.github.pull_request_title,
                &self.git.branch,
                &self.git.branch,
                &self.github.pull_request_body,
            )
            .await?;
        info!(
            owner = client.owner(),
            repo = client.repo(),
            number = pr.number,
            "Pull request opened"
        );
        Ok(())
    }
}
