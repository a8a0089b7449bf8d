//! Artifact store: resolves model artifacts to local files, fetching any
//! missing ones from a remote object store once at startup.

use crate::config::{AppConfig, RemoteBackend, RemoteConfig};
use crate::models::loader::{ArtifactKind, ArtifactPaths};
use anyhow::{bail, Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Region used when neither the config nor the environment names one
const FALLBACK_REGION: &str = "us-east-1";

#[derive(Debug, Clone)]
enum Source {
    /// Plain GET of `<endpoint>/<key>`
    Http { client: Client, endpoint: String },
    /// Signed `GetObject` against a bucket
    S3 {
        client: aws_sdk_s3::Client,
        bucket: String,
    },
}

/// Client for the object store holding the artifacts
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    source: Source,
    config: RemoteConfig,
}

impl RemoteFetcher {
    /// Create a fetcher from remote configuration.
    ///
    /// The s3 backend resolves credentials and region through the AWS
    /// default provider chain (environment, shared config files, web
    /// identity, container and instance metadata).
    pub async fn new(config: &RemoteConfig) -> Result<Self> {
        let source = match config.backend {
            RemoteBackend::Http => Source::Http {
                client: Client::builder()
                    .timeout(Duration::from_millis(config.timeout_ms))
                    .build()
                    .context("Failed to build HTTP client for artifact fetch")?,
                endpoint: config.endpoint.trim_end_matches('/').to_string(),
            },
            RemoteBackend::S3 => Source::S3 {
                client: s3_client(config).await,
                bucket: config.bucket.clone(),
            },
        };

        Ok(Self {
            source,
            config: config.clone(),
        })
    }

    /// Create an s3 fetcher around an already configured client
    pub fn with_s3_client(client: aws_sdk_s3::Client, config: &RemoteConfig) -> Self {
        Self {
            source: Source::S3 {
                client,
                bucket: config.bucket.clone(),
            },
            config: config.clone(),
        }
    }

    /// Human-readable location of an object key
    pub fn location_of(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match &self.source {
            Source::Http { endpoint, .. } => format!("{}/{}", endpoint, key),
            Source::S3 { bucket, .. } => format!("s3://{}/{}", bucket, key),
        }
    }

    /// Download one artifact to `dest`, returning the byte count.
    ///
    /// The body lands in a `.part` file beside `dest` and is renamed into
    /// place only after the full body has been received. A failed write or
    /// rename removes the `.part` file.
    pub async fn download(&self, kind: ArtifactKind, dest: &Path) -> Result<u64> {
        let key = self.config.key_for(kind).trim_start_matches('/');
        let location = self.location_of(key);
        info!(artifact = %kind, location = %location, "Downloading artifact from remote store");

        let body = match &self.source {
            Source::Http { client, .. } => client
                .get(&location)
                .send()
                .await
                .with_context(|| format!("Failed to request {} artifact from {}", kind, location))?
                .error_for_status()
                .with_context(|| format!("Remote store rejected {} artifact request", kind))?
                .bytes()
                .await
                .with_context(|| format!("Failed to read {} artifact body from {}", kind, location))?,
            Source::S3 { client, bucket } => client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .with_context(|| format!("Failed to fetch {} artifact from {}", kind, location))?
                .body
                .collect()
                .await
                .with_context(|| format!("Failed to read {} artifact body from {}", kind, location))?
                .into_bytes(),
        };

        let partial = partial_path(dest);
        if let Err(e) = write_then_rename(&partial, dest, &body).await {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial download");
            }
            return Err(e);
        }

        info!(
            artifact = %kind,
            path = %dest.display(),
            bytes = body.len(),
            "Artifact downloaded"
        );

        Ok(body.len() as u64)
    }
}

async fn s3_client(config: &RemoteConfig) -> aws_sdk_s3::Client {
    let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::from_static(FALLBACK_REGION));
    let timeouts = TimeoutConfig::builder()
        .operation_timeout(Duration::from_millis(config.timeout_ms))
        .build();

    let shared = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(RetryConfig::disabled())
        .timeout_config(timeouts)
        .load()
        .await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    let endpoint = config.endpoint.trim();
    if !endpoint.is_empty() {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(builder.build())
}

async fn write_then_rename(partial: &Path, dest: &Path, body: &[u8]) -> Result<()> {
    tokio::fs::write(partial, body)
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    tokio::fs::rename(partial, dest)
        .await
        .with_context(|| format!("Failed to move artifact into {}", dest.display()))
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Local artifact cache backed by an optional remote store
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    cache_dir: PathBuf,
    paths: ArtifactPaths,
    remote: Option<RemoteFetcher>,
}

impl ArtifactStore {
    /// Create a store from application configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let remote = if config.remote.enabled {
            Some(RemoteFetcher::new(&config.remote).await?)
        } else {
            None
        };

        Ok(Self::with_remote(config, remote))
    }

    /// Create a store around an already built fetcher
    pub fn with_remote(config: &AppConfig, remote: Option<RemoteFetcher>) -> Self {
        Self {
            cache_dir: config.artifacts.cache_dir.clone(),
            paths: config.artifacts.paths(),
            remote,
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Make sure every artifact exists locally.
    ///
    /// Artifacts already on disk are never re-fetched. A missing artifact
    /// with no remote store configured, or a failed download, is an error.
    pub async fn ensure_local(&self) -> Result<&ArtifactPaths> {
        let missing = self.paths.missing();
        if missing.is_empty() {
            info!(cache_dir = %self.cache_dir.display(), "All artifacts present locally");
            return Ok(&self.paths);
        }

        let Some(remote) = &self.remote else {
            let names: Vec<String> = missing
                .iter()
                .map(|&kind| format!("{} ({})", kind, self.paths.get(kind).display()))
                .collect();
            bail!(
                "Missing artifacts and remote fetch is disabled: {}",
                names.join(", ")
            );
        };

        tokio::fs::create_dir_all(&self.cache_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.cache_dir.display()))?;

        for kind in missing {
            remote.download(kind, self.paths.get(kind)).await?;
        }

        Ok(&self.paths)
    }
}
