pub mod client;
pub mod pulls;

pub use client::GitHubClient;
pub use pulls::{CreatedPullRequest, PullRequestHandler};
