use crate::config::CacheConfig;
use crate::errors::WorkerError;
use crate::external::{CommandExecutor, CommandOutput, Invocation};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Runs external commands for one project inside its cache directory.
///
/// This is the only place the per-project directory
/// (`<root_path>/<directory_name>/<project id>`) is computed.
pub struct ExecutionContext {
    project_id: i64,
    projects_dir: PathBuf,
    executor: Arc<dyn CommandExecutor>,
}

impl ExecutionContext {
    pub fn new(cache: &CacheConfig, project_id: i64, executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            project_id,
            projects_dir: cache.root_path.join(&cache.directory_name),
            executor,
        }
    }

    pub fn project_id(&self) -> i64 {
        self.project_id
    }

    /// Directory holding the clones of every project.
    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    /// Directory holding this project's clone.
    pub fn project_dir(&self) -> PathBuf {
        self.projects_dir.join(self.project_id.to_string())
    }

    /// Absolute path of a file given relative to the project root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.project_dir().join(relative)
    }

    pub async fn ensure_projects_dir(&self) -> Result<&Path, WorkerError> {
        tokio::fs::create_dir_all(&self.projects_dir)
            .await
            .map_err(|e| WorkerError::io(&self.projects_dir, e))?;
        Ok(&self.projects_dir)
    }

    pub async fn ensure_project_dir(&self) -> Result<PathBuf, WorkerError> {
        let dir = self.project_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| WorkerError::io(&dir, e))?;
        Ok(dir)
    }

    /// Run `program` with `args` in the project directory (or `cwd` when given),
    /// creating the project directory first. Returns standard output.
    pub async fn run(
        &self,
        program: &str,
        args: &[&str],
        cwd: Option<&Path>,
    ) -> Result<Vec<u8>, WorkerError> {
        let project_dir = self.ensure_project_dir().await?;
        let cwd = cwd.map(Path::to_path_buf).unwrap_or(project_dir);
        self.execute(Invocation::new(program, args.iter().copied(), cwd))
            .await
    }

    /// Run a free-form command line through the platform shell in the project directory.
    pub async fn run_shell(&self, command_line: &str) -> Result<Vec<u8>, WorkerError> {
        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        self.run(shell, &[flag, command_line], None).await
    }

    /// Run `program` in the project directory and hand back its raw output,
    /// leaving the exit status for the caller to interpret.
    pub async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput, WorkerError> {
        let project_dir = self.ensure_project_dir().await?;
        self.spawn(&Invocation::new(program, args.iter().copied(), project_dir))
            .await
    }

    /// Execute an invocation as-is; a non-zero exit becomes `CommandFailed`.
    pub(crate) async fn execute(&self, invocation: Invocation) -> Result<Vec<u8>, WorkerError> {
        let output = self.spawn(&invocation).await?;

        if !output.success() {
            return Err(WorkerError::CommandFailed {
                command: invocation.to_string(),
                status_code: output.status_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    async fn spawn(&self, invocation: &Invocation) -> Result<CommandOutput, WorkerError> {
        debug!(
            command = %invocation,
            cwd = %invocation.cwd.display(),
            "Running external command"
        );
        Ok(self.executor.execute(invocation).await?)
    }
}
