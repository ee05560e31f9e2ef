use crate::errors::WorkerError;
use crate::models::{Project, RequirementsFile};
use tracing::debug;

/// Persists each requirements file through the persistence API.
pub struct MetadataReporter {
    client: reqwest::Client,
    address: String,
}

impl MetadataReporter {
    pub fn new(client: reqwest::Client, address: impl Into<String>) -> Self {
        Self {
            client,
            address: address.into(),
        }
    }

    pub fn requirements_file_url(&self, requirements_file: &RequirementsFile) -> String {
        format!(
            "{}/api/v1/requirements-files/{}",
            self.address.trim_end_matches('/'),
            requirements_file.id
        )
    }

    pub async fn update_metadata(&self, project: &Project) -> Result<(), WorkerError> {
        for requirements_file in &project.requirements_files {
            let url = self.requirements_file_url(requirements_file);
            debug!(%url, requirements = requirements_file.requirements.len(), "Persisting requirements file");
            self.client
                .put(&url)
                .json(requirements_file)
                .send()
                .await?
                .error_for_status()?;
        }
        Ok(())
    }
}
