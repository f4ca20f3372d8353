//! Configuration management for the CZ ID uploader
//!
//! [`AppConfig`] is the TOML file: API endpoint and timeouts, storage
//! transfer tuning, and logging. [`UploadConfig`] is what one invocation asks
//! for and is handed to the orchestrator explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::client::ClientConfig;
use crate::app::transfer::TransferConfig;
use crate::app::workflow::{SampleOptions, Workflow};
use crate::constants::{api, env, transfer};
use crate::errors::{ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// CZ ID API settings
    pub api: ApiConfigToml,
    /// Object storage transfer settings
    pub storage: StorageConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly API configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfigToml {
    /// API base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// TCP keep-alive timeout in seconds (None = disabled)
    pub tcp_keepalive_secs: Option<u64>,
    /// Environment variable holding the bearer token
    pub token_env: String,
}

impl Default for ApiConfigToml {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: api::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: api::CONNECT_TIMEOUT.as_secs(),
            tcp_keepalive_secs: Some(30),
            token_env: env::TOKEN.to_string(),
        }
    }
}

/// TOML-friendly storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfigToml {
    /// Region of the upload buckets
    pub region: String,
    /// Preferred multipart part size in bytes
    pub part_size_bytes: u64,
    /// Parts uploaded at once (None = number of CPUs)
    pub concurrency: Option<usize>,
    /// Capacity of the part-completion queue
    pub progress_queue_capacity: usize,
    /// Draw progress bars when attached to a terminal
    pub progress_bars: bool,
}

impl Default for StorageConfigToml {
    fn default() -> Self {
        Self {
            region: transfer::DEFAULT_REGION.to_string(),
            part_size_bytes: transfer::DEFAULT_PART_SIZE,
            concurrency: None,
            progress_queue_capacity: transfer::PROGRESS_QUEUE_CAPACITY,
            progress_bars: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound { path }.into());
            }
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        if let Some(path) = config_path {
            config = Self::load_from_file(&path).await?;
        }

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var(env::BASE_URL) {
            if !base_url.trim().is_empty() {
                debug!("Using API base URL from {}", env::BASE_URL);
                self.api.base_url = base_url;
            }
        }
    }

    /// Check values the runtime cannot work with
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.storage.part_size_bytes < transfer::MIN_PART_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "storage.part_size_bytes".to_string(),
                reason: format!("must be at least {} bytes", transfer::MIN_PART_SIZE),
            });
        }
        if self.storage.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "storage.concurrency".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./czid-uploader.toml")];
        if let Some(path) = Self::get_default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("czid-uploader").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Runtime configuration for the API client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.base_url.clone(),
            token_env: self.api.token_env.clone(),
            tcp_keepalive: self.api.tcp_keepalive_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.api.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
        }
    }

    /// Runtime configuration for the transfer engine
    pub fn transfer_config(&self) -> TransferConfig {
        let defaults = TransferConfig::default();
        TransferConfig {
            part_size: self.storage.part_size_bytes,
            concurrency: self.storage.concurrency.unwrap_or(defaults.concurrency),
            progress_queue_capacity: self.storage.progress_queue_capacity,
            show_progress: self.storage.progress_bars && defaults.show_progress,
        }
    }
}

/// What one upload run was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Name of the destination project
    pub project: String,
    pub workflow: Workflow,
    pub options: SampleOptions,
    /// `KEY=VALUE` metadata applied to every sample
    pub metadata: Vec<String>,
    /// Optional metadata spreadsheet
    pub metadata_csv: Option<PathBuf>,
}

impl UploadConfig {
    pub fn new(project: impl Into<String>, workflow: Workflow) -> Self {
        Self {
            project: project.into(),
            workflow,
            options: SampleOptions::default(),
            metadata: Vec::new(),
            metadata_csv: None,
        }
    }
}
