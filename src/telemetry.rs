use crate::config::ObservabilityConfig;
use crate::models::Project;
use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Initialize structured logging.
///
/// `RUST_LOG` directives take precedence over the configured level. Output
/// goes to stderr so stdout stays free for command results.
pub fn init_telemetry(config: &ObservabilityConfig) -> Result<()> {
    let level: LevelFilter = config.log_level.parse().unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    tracing::debug!("Telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the events of one run
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create the span every workflow run executes in
pub fn create_run_span(project: &Project, correlation_id: &str) -> tracing::Span {
    tracing::info_span!(
        "workflow_run",
        project.id = project.id,
        project.name = %project.name,
        repository.flavor = %project.repository.flavor,
        correlation.id = correlation_id
    )
}
