use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use depwatch::{
    init_telemetry, ProcessCommandExecutor, Project, ProjectOperations, WorkerConfig,
    WorkflowEngine,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

#[derive(Parser)]
#[command(name = "depwatch")]
#[command(about = "Keep a project's pinned Python requirements up to date")]
#[command(long_about = "depwatch clones a project, looks for newer versions of its pinned \
                       requirements, validates them with the project's check command and \
                       publishes the change by push, pull request or review.")]
struct Cli {
    /// Configuration file (defaults to ./depwatch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the update workflow for one processing request
    Process {
        /// Path to a JSON processing request, or `-` for stdin
        request: String,
        /// Validate the upgrade without committing, publishing or reporting it
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WorkerConfig::load_env_file()?;
    let mut config = WorkerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
        Commands::Process { request, dry_run } => {
            if dry_run {
                config.worker.dry_run = true;
            }
            init_telemetry(&config.observability)?;
            tokio::runtime::Runtime::new()?.block_on(async { process_command(&config, &request).await })
        }
    }
}

async fn read_request(source: &str) -> Result<String> {
    if source == "-" {
        let mut payload = String::new();
        tokio::io::stdin()
            .read_to_string(&mut payload)
            .await
            .context("Failed to read processing request from stdin")?;
        return Ok(payload);
    }

    tokio::fs::read_to_string(source)
        .await
        .with_context(|| format!("Failed to read processing request from {source}"))
}

async fn process_command(config: &WorkerConfig, source: &str) -> Result<()> {
    let payload = read_request(source).await?;
    let mut project = Project::from_request_json(&payload)?;

    let operations = ProjectOperations::new(config, &project, Arc::new(ProcessCommandExecutor))?;
    let notifier = |state: &str| tracing::info!(state, "Workflow state changed");
    let engine = WorkflowEngine::new(operations, &config.worker, Arc::new(notifier))?;

    let report = engine.run(&mut project).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.succeeded() {
        bail!("Workflow for project {} ended in {}", project.id, report.final_state);
    }
    Ok(())
}
