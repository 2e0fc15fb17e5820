//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Credentials never live in the TOML; the file only names where the
//! credential list is, and CLASSIFIER_CREDENTIALS_FILE can override it.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::RetryPolicy;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub metrics: Option<MetricsConfig>,
}

/// Input identifier file
#[derive(Debug, Deserialize)]
pub struct InputConfig {
    pub path: PathBuf,
    #[serde(default = "default_id_column")]
    pub id_column: String,
}

/// Output store and failure log
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,
}

/// Credential list location
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

/// Metadata endpoint settings
#[derive(Debug, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Longest duration, inclusive, still labelled short
    #[serde(default = "default_short_max_secs")]
    pub short_max_secs: u64,
}

/// Worker, retry and checkpoint tuning
#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Attempts per checkpoint flush; at least 2 so a flush is retried once
    #[serde(default = "default_flush_attempts")]
    pub flush_attempts: u32,
}

/// Prometheus textfile written when the run ends
#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub textfile: PathBuf,
}

fn default_id_column() -> String {
    "video_id".into()
}

fn default_label_column() -> String {
    "video_type".into()
}

fn default_failure_log() -> PathBuf {
    PathBuf::from("failed_ids.log")
}

fn default_endpoint_url() -> String {
    video_lookup::DEFAULT_ENDPOINT.into()
}

fn default_timeout() -> u64 {
    10
}

fn default_short_max_secs() -> u64 {
    60
}

fn default_workers() -> usize {
    8
}

fn default_flush_threshold() -> usize {
    500
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_flush_attempts() -> u32 {
    2
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            timeout_secs: default_timeout(),
            short_max_secs: default_short_max_secs(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            flush_threshold: default_flush_threshold(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            flush_attempts: default_flush_attempts(),
        }
    }
}

impl EngineConfig {
    /// Outer retry policy for one identifier's lookup.
    pub fn lookup_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.max_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// Retry policy for one checkpoint flush.
    pub fn flush_retry(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.flush_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }
}

impl Config {
    /// Load configuration from a TOML file, validate it, then overlay
    /// environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if !config.lookup.endpoint_url.starts_with("http://")
            && !config.lookup.endpoint_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "endpoint_url must start with http:// or https://, got: {}",
                config.lookup.endpoint_url
            )));
        }

        if config.lookup.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.engine.workers == 0 {
            return Err(common::Error::Config(
                "workers must be greater than 0".into(),
            ));
        }

        if config.engine.flush_threshold == 0 {
            return Err(common::Error::Config(
                "flush_threshold must be greater than 0".into(),
            ));
        }

        if config.engine.max_attempts == 0 {
            return Err(common::Error::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }

        if config.engine.flush_attempts < 2 {
            return Err(common::Error::Config(format!(
                "flush_attempts must be at least 2, got: {}",
                config.engine.flush_attempts
            )));
        }

        if config.input.id_column.trim().is_empty() || config.output.label_column.trim().is_empty()
        {
            return Err(common::Error::Config(
                "id_column and label_column must not be empty".into(),
            ));
        }

        if let Ok(p) = std::env::var("CLASSIFIER_CREDENTIALS_FILE") {
            config.credentials.path = PathBuf::from(p);
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("batch-classifier.toml")
    }
}
