use super::pulls::PullRequestHandler;
use crate::config::GitHubConfig;
use crate::errors::WorkerError;
use crate::models::RepositoryDescriptor;
use octocrab::Octocrab;

/// Authenticated API client bound to one hosted repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubClient {
    /// Build a client from the repository's hosting settings.
    ///
    /// The API address falls back to the configured default; owner and
    /// project name are mandatory.
    pub fn for_repository(
        repository: &RepositoryDescriptor,
        config: &GitHubConfig,
    ) -> Result<Self, WorkerError> {
        let owner = required(&repository.github_project_owner, "github_project_owner")?;
        let repo = required(&repository.github_project_name, "github_project_name")?;
        let api_address = repository
            .github_api_address
            .as_deref()
            .filter(|address| !address.is_empty())
            .unwrap_or(&config.default_api_address);

        let mut builder = Octocrab::builder().base_uri(api_address.to_string())?;
        if let Some(token) = config.token.as_deref().filter(|token| !token.is_empty()) {
            builder = builder.personal_token(token.to_string());
        }

        Ok(Self {
            octocrab: builder.build()?,
            owner,
            repo,
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn pulls(&self) -> PullRequestHandler {
        PullRequestHandler::new(self.octocrab.clone(), self.owner.clone(), self.repo.clone())
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, WorkerError> {
    value
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(WorkerError::GitHubSettingsMissing { field })
}
