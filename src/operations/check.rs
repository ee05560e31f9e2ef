use crate::errors::WorkerError;
use crate::execution::{VenvOperation, PIP};
use crate::manifest;
use crate::models::{PackageUpdateSuggestion, Project};
use std::sync::Arc;
use tracing::{debug, error};

/// Installs the declared packages into the isolated environment and proposes
/// newer versions for the outdated ones.
pub struct UpdateChecker {
    venv: Arc<VenvOperation>,
}

impl UpdateChecker {
    pub fn new(venv: Arc<VenvOperation>) -> Self {
        Self { venv }
    }

    /// Check for updates. Any failure is logged and reported as "no suggestions".
    pub async fn check(&self, project: &mut Project) -> Vec<PackageUpdateSuggestion> {
        match self.try_check(project).await {
            Ok(suggestions) => suggestions,
            Err(err) => {
                error!(error = %err, "Unable to check for outdated packages");
                Vec::new()
            }
        }
    }

    async fn try_check(&self, project: &mut Project) -> Result<Vec<PackageUpdateSuggestion>, WorkerError> {
        for requirements_file in &project.requirements_files {
            debug!(file = %requirements_file.path, "Installing requirements into environment");
            self.venv
                .run(PIP, &["install", "-U", "-r", requirements_file.path.as_str()])
                .await?;
        }

        debug!("Listing outdated packages");
        let output = self
            .venv
            .run(PIP, &["list", "--outdated", "--format=columns"])
            .await?;
        let suggestions = parse_outdated(&String::from_utf8_lossy(&output));
        debug!(count = suggestions.len(), "Outdated packages found");

        apply_suggestions(project, &suggestions);
        Ok(suggestions)
    }
}

/// Parse the columnar outdated listing: two header lines, then
/// `name version latest type` rows.
pub fn parse_outdated(output: &str) -> Vec<PackageUpdateSuggestion> {
    output
        .lines()
        .skip(2)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            match columns.as_slice() {
                [name, _current, latest, ..] => Some(PackageUpdateSuggestion {
                    name: name.to_string(),
                    new_version: latest.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

/// Set `desired_version` on every matching requirement that has none yet.
/// Operator-pinned desired versions and direct references are left alone.
pub fn apply_suggestions(project: &mut Project, suggestions: &[PackageUpdateSuggestion]) {
    for suggestion in suggestions {
        for requirement in project.requirements_mut() {
            if !requirement.matches_name(&suggestion.name) {
                continue;
            }
            if manifest::is_direct_reference(&requirement.current_version) {
                debug!(package = %requirement.name, "Direct reference, not proposing a version");
                continue;
            }
            if requirement.desired_version.is_empty() {
                debug!(
                    package = %requirement.name,
                    version = %suggestion.new_version,
                    "Proposing new version"
                );
                requirement.desired_version = suggestion.new_version.clone();
            }
        }
    }
}
