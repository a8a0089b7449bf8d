//! Configuration management for the scoring service
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file,
//! then `CREDIT_RISK__<SECTION>__<KEY>` environment variables.

use crate::feature_aligner::EncodingPolicy;
use crate::models::loader::{ArtifactKind, ArtifactPaths};
use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CREDIT_RISK";
/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "CREDIT_RISK_CONFIG";
/// Config file used when none is named; may be absent
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub remote: RemoteConfig,
    pub features: FeaturesConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Local artifact cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding (or receiving) the artifacts
    pub cache_dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    pub columns_file: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("model_cache"),
            model_file: "logistic_credit_model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            columns_file: "train_columns.json".to_string(),
        }
    }
}

impl ArtifactsConfig {
    /// Full local paths of the three artifacts
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            classifier: self.cache_dir.join(&self.model_file),
            scaler: self.cache_dir.join(&self.scaler_file),
            columns: self.cache_dir.join(&self.columns_file),
        }
    }
}

/// How artifacts are fetched from the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// S3 `GetObject`, signed with the AWS default credential chain
    #[default]
    S3,
    /// Unauthenticated GET of `<endpoint>/<key>` (public or presigned)
    Http,
}

/// Remote object store holding the artifacts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Fetch missing artifacts at startup
    pub enabled: bool,
    pub backend: RemoteBackend,
    /// Bucket name (s3 backend)
    pub bucket: String,
    /// Region override (s3 backend); the default provider chain otherwise
    pub region: Option<String>,
    /// Base URL for the http backend. For s3, an optional S3-compatible
    /// endpoint addressed path-style.
    pub endpoint: String,
    pub model_key: String,
    pub scaler_key: String,
    pub columns_key: String,
    /// Per-download timeout
    pub timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: RemoteBackend::S3,
            bucket: String::new(),
            region: None,
            endpoint: String::new(),
            model_key: "model/logistic_credit_model.json".to_string(),
            scaler_key: "model/scaler.json".to_string(),
            columns_key: "model/train_columns.json".to_string(),
            timeout_ms: 30_000,
        }
    }
}

impl RemoteConfig {
    /// Object key of an artifact
    pub fn key_for(&self, kind: ArtifactKind) -> &str {
        match kind {
            ArtifactKind::Classifier => &self.model_key,
            ArtifactKind::Scaler => &self.scaler_key,
            ArtifactKind::Columns => &self.columns_key,
        }
    }
}

/// Feature preprocessing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub encoding: EncodingPolicy,
}

/// In-process metrics reporting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries; 0 disables periodic reports
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration for the running process.
    ///
    /// The file is the first CLI argument, else `CREDIT_RISK_CONFIG`, else
    /// `config/config.toml` if it exists.
    pub fn load() -> Result<Self> {
        let explicit = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());

        match explicit {
            Some(path) => Self::build(Path::new(&path), true),
            None => Self::build(Path::new(DEFAULT_CONFIG_PATH), false),
        }
    }

    /// Load configuration from a specific file, which must exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path.as_ref(), true)
    }

    fn build(path: &Path, required: bool) -> Result<Self> {
        let config: AppConfig = Config::builder()
            .add_source(File::from(path).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path.display()))?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot work together
    pub fn validate(&self) -> Result<()> {
        if self.remote.enabled {
            match self.remote.backend {
                RemoteBackend::S3 if self.remote.bucket.trim().is_empty() => {
                    bail!("remote.backend is s3 but remote.bucket is empty");
                }
                RemoteBackend::Http if self.remote.endpoint.trim().is_empty() => {
                    bail!("remote.backend is http but remote.endpoint is empty");
                }
                _ => {}
            }
        }
        if self.server.listen_addr.trim().is_empty() {
            bail!("server.listen_addr must not be empty");
        }
        Ok(())
    }
}
