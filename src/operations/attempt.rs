use crate::errors::WorkerError;
use crate::execution::{ExecutionContext, VenvOperation, PIP};
use crate::manifest;
use crate::models::{Project, RequirementsFile};
use std::sync::Arc;
use tracing::debug;

/// Pins the proposed versions into each manifest, reinstalls, and validates the
/// result with the project's self-check command.
///
/// Every failure propagates: success or failure of this operation is what
/// decides whether the change gets published.
pub struct UpdateAttempter {
    context: Arc<ExecutionContext>,
    venv: Arc<VenvOperation>,
}

impl UpdateAttempter {
    pub fn new(context: Arc<ExecutionContext>, venv: Arc<VenvOperation>) -> Self {
        Self { context, venv }
    }

    pub async fn attempt(&self, project: &Project) -> Result<(), WorkerError> {
        for requirements_file in &project.requirements_files {
            debug!(file = %requirements_file.path, "Rewriting requirements file");
            self.rewrite(requirements_file).await?;

            debug!(file = %requirements_file.path, "Installing rewritten requirements");
            self.venv
                .run(PIP, &["install", "-U", "-r", requirements_file.path.as_str()])
                .await?;
        }

        debug!(command = %project.check_command, "Validating upgraded requirements");
        self.context.run_shell(&project.check_command).await?;
        Ok(())
    }

    async fn rewrite(&self, requirements_file: &RequirementsFile) -> Result<(), WorkerError> {
        let full_path = self.context.resolve(&requirements_file.path);

        tokio::fs::remove_file(&full_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WorkerError::ManifestNotFound {
                path: full_path.clone(),
            },
            _ => WorkerError::io(&full_path, e),
        })?;

        let contents = manifest::render_manifest(&requirements_file.requirements);
        tokio::fs::write(&full_path, contents)
            .await
            .map_err(|e| WorkerError::io(&full_path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, VenvConfig};
    use crate::external::ScriptedExecutor;
    use crate::models::{fixtures, Flavor};
    use std::path::Path;

    fn attempter(root: &Path, executor: Arc<ScriptedExecutor>) -> UpdateAttempter {
        let cache = CacheConfig {
            root_path: root.to_path_buf(),
            directory_name: "cache".to_string(),
        };
        let context = Arc::new(ExecutionContext::new(&cache, 7, executor));
        let venv = Arc::new(VenvOperation::new(context.clone(), VenvConfig::default()));
        UpdateAttempter::new(context, venv)
    }

    fn write_manifest(root: &Path, contents: &str) -> std::path::PathBuf {
        let dir = root.join("cache/7");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("requirements.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_rewrites_sorted_pins_then_installs_and_checks() {
        let root = tempfile::tempdir().unwrap();
        let path = write_manifest(root.path(), "six==1.10.0\nrequests==2.12.0\n");
        let executor = Arc::new(ScriptedExecutor::new());
        let project = fixtures::project(
            Flavor::Git,
            vec![
                fixtures::requirement(1, "six", "1.10.0", ""),
                fixtures::requirement(2, "requests", "2.12.0", "2.13.0"),
            ],
        );

        attempter(root.path(), executor.clone()).attempt(&project).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "requests==2.13.0\nsix==1.10.0\n"
        );
        let invocations = executor.invocations();
        let install = invocations
            .iter()
            .position(|i| i.program.ends_with("pip") && i.args[0] == "install")
            .unwrap();
        let check = invocations
            .iter()
            .position(|i| i.args.last().map(String::as_str) == Some("pytest"))
            .unwrap();
        assert!(install < check);
    }

    #[tokio::test]
    async fn test_failing_self_check_propagates() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(root.path(), "requests==2.12.0\n");
        let executor = Arc::new(ScriptedExecutor::new().on(
            "sh",
            &["-c", "pytest"],
            Ok(ScriptedExecutor::exit(1, "3 failed")),
        ));
        let project = fixtures::project(
            Flavor::Git,
            vec![fixtures::requirement(2, "requests", "2.12.0", "2.13.0")],
        );

        let err = attempter(root.path(), executor).attempt(&project).await.unwrap_err();
        assert!(matches!(err, WorkerError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_manifest_fails_before_install() {
        let root = tempfile::tempdir().unwrap();
        let executor = Arc::new(ScriptedExecutor::new());
        let project = fixtures::project(
            Flavor::Git,
            vec![fixtures::requirement(2, "requests", "2.12.0", "2.13.0")],
        );

        let err = attempter(root.path(), executor.clone()).attempt(&project).await.unwrap_err();
        assert!(matches!(err, WorkerError::ManifestNotFound { .. }));
        assert!(executor.invocations().is_empty());
    }
}
