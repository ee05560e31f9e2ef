//! Data objects received from and reported back to the persistence collaborator.

use crate::errors::RequestError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

pub type RequirementId = i64;

/// Repository hosting kind; selects the change publisher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Flavor {
    Git,
    GitHub,
    Gerrit,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flavor::Git => "git",
            Flavor::GitHub => "github",
            Flavor::Gerrit => "gerrit",
        }
    }
}

impl TryFrom<String> for Flavor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "git" => Ok(Flavor::Git),
            "github" => Ok(Flavor::GitHub),
            "gerrit" => Ok(Flavor::Gerrit),
            other => Err(format!("unknown repository flavor '{other}'")),
        }
    }
}

impl From<Flavor> for String {
    fn from(flavor: Flavor) -> Self {
        flavor.as_str().to_string()
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(alias = "flavour")]
    pub flavor: Flavor,
    pub url: String,
    #[serde(default)]
    pub upstream_url: Option<String>,
    #[serde(default)]
    pub github_api_address: Option<String>,
    #[serde(default)]
    pub github_project_owner: Option<String>,
    #[serde(default)]
    pub github_project_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default)]
    pub id: Option<RequirementId>,
    pub name: String,
    #[serde(default)]
    pub current_version: String,
    #[serde(default)]
    pub desired_version: String,
    #[serde(default)]
    pub status: String,
}

impl Requirement {
    /// A requirement discovered in a manifest, not yet known to the datastore.
    pub fn discovered(name: impl Into<String>, current_version: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            current_version: current_version.into(),
            desired_version: String::new(),
            status: String::new(),
        }
    }

    /// Package names compare case-insensitively with `-` and `_` treated alike.
    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsFile {
    pub id: i64,
    pub path: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl RequirementsFile {
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Requirement> {
        self.requirements
            .iter_mut()
            .find(|requirement| requirement.matches_name(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    #[serde(default)]
    pub namespace_id: Option<i64>,
    pub name: String,
    #[serde(alias = "git_repository")]
    pub repository: RepositoryDescriptor,
    #[serde(default)]
    pub check_command: String,
    #[serde(default)]
    pub requirements_files: Vec<RequirementsFile>,
}

impl Project {
    /// Decode an inbound processing request.
    pub fn from_request_json(payload: &str) -> Result<Self, RequestError> {
        Ok(serde_json::from_str(payload)?)
    }

    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements_files
            .iter()
            .flat_map(|file| file.requirements.iter())
    }

    pub fn requirements_mut(&mut self) -> impl Iterator<Item = &mut Requirement> {
        self.requirements_files
            .iter_mut()
            .flat_map(|file| file.requirements.iter_mut())
    }

    /// Ids of requirements whose desired version is already set.
    pub fn locked_requirement_ids(&self) -> HashSet<RequirementId> {
        self.requirements()
            .filter(|requirement| !requirement.desired_version.is_empty())
            .filter_map(|requirement| requirement.id)
            .collect()
    }
}

/// Transient (name, newer version) pair produced by the update checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUpdateSuggestion {
    pub name: String,
    pub new_version: String,
}
