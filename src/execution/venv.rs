use super::context::ExecutionContext;
use crate::config::VenvConfig;
use crate::errors::WorkerError;
use crate::external::Invocation;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// The environment's package installer.
pub const PIP: &str = "pip";

/// Runs executables from the project's isolated environment, creating the
/// environment first when it does not exist.
///
/// Executables always run from the project root; there is no working
/// directory override.
pub struct VenvOperation {
    context: Arc<ExecutionContext>,
    config: VenvConfig,
}

impl VenvOperation {
    pub fn new(context: Arc<ExecutionContext>, config: VenvConfig) -> Self {
        Self { context, config }
    }

    /// Platform-specific executable file name (`pip` or `pip.exe`).
    pub fn executable_name(name: &str) -> String {
        format!("{name}{}", std::env::consts::EXE_SUFFIX)
    }

    pub fn venv_dir(&self) -> PathBuf {
        self.context.project_dir().join(&self.config.directory)
    }

    fn bin_dir(&self) -> PathBuf {
        let bin = if cfg!(windows) { "Scripts" } else { "bin" };
        self.venv_dir().join(bin)
    }

    pub async fn run(&self, executable: &str, args: &[&str]) -> Result<Vec<u8>, WorkerError> {
        let project_dir = self.context.ensure_project_dir().await?;
        if !self.venv_dir().exists() {
            self.create(&project_dir).await?;
        }

        let program = self.bin_dir().join(Self::executable_name(executable));
        self.context
            .execute(Invocation::new(
                program.to_string_lossy(),
                args.iter().copied(),
                project_dir,
            ))
            .await
    }

    async fn create(&self, project_dir: &std::path::Path) -> Result<(), WorkerError> {
        let mut args = vec![self.config.directory.clone()];
        if !cfg!(windows) {
            args.push(format!("--python={}", self.config.python));
        }

        debug!(directory = %self.config.directory, "Creating isolated environment");
        self.context
            .execute(Invocation::new(self.config.creator.clone(), args, project_dir))
            .await?;
        Ok(())
    }
}
