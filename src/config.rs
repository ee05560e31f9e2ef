use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for the depwatch worker
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Repository cache location
    pub cache: CacheConfig,
    /// Run behaviour
    pub worker: RunConfig,
    /// Commit and push settings
    pub git: GitConfig,
    /// Pull request settings for GitHub-flavored repositories
    pub github: GitHubConfig,
    /// Persistence API settings
    pub api: ApiConfig,
    /// Isolated environment settings
    pub venv: VenvConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root under which the cache directory lives
    pub root_path: PathBuf,
    /// Name of the directory holding one clone per project
    pub directory_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Validate upgrades but never commit, push or send the final metadata update
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    pub commit_message: String,
    pub remote: String,
    pub branch: String,
    /// Remote name used for fork synchronization
    pub upstream_remote: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token (can be set via env var); never rendered by `to_toml`
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub pull_request_title: String,
    pub pull_request_body: String,
    /// Used when the repository does not name its own API address
    pub default_api_address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address of the persistence API
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VenvConfig {
    /// Program that creates the environment
    pub creator: String,
    /// Environment directory, relative to the project directory
    pub directory: String,
    /// Interpreter passed to the creator on non-Windows platforms
    pub python: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level
    pub log_level: String,
    /// Emit JSON formatted logs
    pub json: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            root_path: home.join(".cache"),
            directory_name: "depwatch-cache".to_string(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            commit_message: "[depwatch] - Automatic increment of requirements versions.".to_string(),
            remote: "origin".to_string(),
            branch: "master".to_string(),
            upstream_remote: "upstream".to_string(),
        }
    }
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None, // Will be read from GITHUB_TOKEN when unset
            pull_request_title: "[depwatch] Update requirements".to_string(),
            pull_request_body: "Automatic increment of requirements versions, validated by the project check command.".to_string(),
            default_api_address: "https://api.github.com".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for VenvConfig {
    fn default() -> Self {
        Self {
            creator: "virtualenv".to_string(),
            directory: "virtualenv".to_string(),
            python: "python3".to_string(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: true,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (`depwatch.toml`, or the explicit path)
    /// 3. Environment variables (prefixed with DEPWATCH__)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(File::from(path));
            }
            None => {
                if Path::new("depwatch.toml").exists() {
                    builder = builder.add_source(File::with_name("depwatch"));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("DEPWATCH")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to read configuration")?;
        let mut worker_config: WorkerConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if worker_config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                worker_config.github.token = Some(token);
            }
        }

        worker_config.cache.root_path = expand_home(&worker_config.cache.root_path);
        Ok(worker_config)
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
