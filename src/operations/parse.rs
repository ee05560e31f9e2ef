use crate::errors::WorkerError;
use crate::execution::ExecutionContext;
use crate::manifest::{self, DeclaredPackage};
use crate::models::{Project, Requirement, RequirementsFile};
use std::sync::Arc;
use tracing::debug;

/// Reconciles the requirements declared in each manifest with the project model.
pub struct ManifestParser {
    context: Arc<ExecutionContext>,
}

impl ManifestParser {
    pub fn new(context: Arc<ExecutionContext>) -> Self {
        Self { context }
    }

    pub async fn parse(&self, project: &mut Project) -> Result<(), WorkerError> {
        for requirements_file in &mut project.requirements_files {
            debug!(file = %requirements_file.path, "Parsing requirements file");
            self.parse_file(requirements_file).await?;
        }
        Ok(())
    }

    async fn parse_file(&self, requirements_file: &mut RequirementsFile) -> Result<(), WorkerError> {
        let full_path = self.context.resolve(&requirements_file.path);
        debug!(path = %full_path.display(), "Opening requirements file");

        let contents = tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => WorkerError::ManifestNotFound {
                    path: full_path.clone(),
                },
                _ => WorkerError::io(&full_path, e),
            })?;

        reconcile(requirements_file, &contents);
        Ok(())
    }
}

/// Apply the packages declared in `contents` to the file's requirements.
///
/// New packages are appended; changed versions overwrite `current_version`.
/// `desired_version` is never touched.
pub fn reconcile(requirements_file: &mut RequirementsFile, contents: &str) {
    for declared in manifest::parse_manifest(contents) {
        reconcile_one(requirements_file, declared);
    }
}

fn reconcile_one(requirements_file: &mut RequirementsFile, declared: DeclaredPackage) {
    match requirements_file.find_mut(&declared.name) {
        None => {
            debug!(package = %declared.name, version = %declared.version, "Adding newly declared requirement");
            requirements_file
                .requirements
                .push(Requirement::discovered(declared.name, declared.version));
        }
        Some(existing) if existing.current_version != declared.version => {
            debug!(
                package = %existing.name,
                previous = %existing.current_version,
                version = %declared.version,
                "Overriding requirement version from manifest"
            );
            existing.current_version = declared.version;
        }
        Some(_) => {}
    }
}
