use crate::errors::WorkerError;
use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Handler for GitHub pull request operations
#[derive(Debug, Clone)]
pub struct PullRequestHandler {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

#[derive(Debug, Serialize)]
struct NewPullRequest<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
    maintainer_can_modify: bool,
}

/// The fields of a created pull request the worker cares about.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPullRequest {
    pub number: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl PullRequestHandler {
    pub fn new(octocrab: Octocrab, owner: String, repo: String) -> Self {
        Self {
            octocrab,
            owner,
            repo,
        }
    }

    /// Create a new pull request
    pub async fn create_pull_request(
        &self,
        title: &str,
        head_branch: &str,
        base_branch: &str,
        body: &str,
    ) -> Result<CreatedPullRequest, WorkerError> {
        let route = format!("/repos/{}/{}/pulls", self.owner, self.repo);
        let request = NewPullRequest {
            title,
            head: head_branch,
            base: base_branch,
            body,
            maintainer_can_modify: true,
        };

        let pr: CreatedPullRequest = self.octocrab.post(route, Some(&request)).await?;

        info!(
            number = pr.number,
            url = pr.html_url.as_deref().unwrap_or_default(),
            "Created pull request"
        );
        Ok(pr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GitHubConfig;
    use crate::github::GitHubClient;
    use crate::models::{fixtures, Flavor};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> GitHubClient {
        let mut project = fixtures::project(Flavor::GitHub, vec![]);
        project.repository.github_api_address = Some(server.uri());
        project.repository.github_project_owner = Some("acme".to_string());
        project.repository.github_project_name = Some("widgets".to_string());
        let config = GitHubConfig {
            token: Some("secret".to_string()),
            ..GitHubConfig::default()
        };
        GitHubClient::for_repository(&project.repository, &config).unwrap()
    }

    #[tokio::test]
    async fn test_create_pull_request_posts_to_repository() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/pulls"))
            .and(body_partial_json(serde_json::json!({
                "title": "Update requirements",
                "head": "master",
                "base": "master",
                "maintainer_can_modify": true
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "number": 42,
                "html_url": "https://github.com/acme/widgets/pull/42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let pr = client_for(&server)
            .await
            .pulls()
            .create_pull_request("Update requirements", "master", "master", "Automated")
            .await
            .unwrap();

        assert_eq!(pr.number, 42);
    }

    #[tokio::test]
    async fn test_rejected_pull_request_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .await
            .pulls()
            .create_pull_request("Update requirements", "master", "master", "Automated")
            .await;

        assert!(matches!(result, Err(WorkerError::GitHub(_))));
    }
}
