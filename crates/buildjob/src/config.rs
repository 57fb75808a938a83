//! Service Configuration
//!
//! Loaded from a mounted YAML file (for example a ConfigMap volume). Every
//! section has defaults, so an empty or missing file yields a working
//! service that writes manifests to `./jobs` and submits them when running
//! inside a cluster.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main service configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Kubernetes namespace the build Jobs are created in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Directory rendered manifests are written to
    #[serde(default = "default_artifacts_dir", rename = "artifactsDir")]
    pub artifacts_dir: PathBuf,

    /// Job template settings
    #[serde(default)]
    pub job: JobConfig,

    /// Container images used by the build pod
    #[serde(default)]
    pub images: ImagesConfig,

    /// Cluster submission settings
    #[serde(default)]
    pub submission: SubmissionConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the API listens on
    #[serde(default = "default_listen_addr", rename = "listenAddr")]
    pub listen_addr: String,

    /// Whole-request timeout in seconds
    #[serde(default = "default_request_timeout", rename = "requestTimeoutSeconds")]
    pub request_timeout_seconds: u64,

    /// Largest accepted request body in bytes
    #[serde(default = "default_body_limit", rename = "maxBodyBytes")]
    pub max_body_bytes: usize,
}

/// Job template settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfig {
    /// Seconds a finished Job is kept before garbage collection
    #[serde(default = "default_ttl", rename = "ttlSecondsAfterFinished")]
    pub ttl_seconds_after_finished: i32,

    /// Pod retries before the Job is marked failed
    #[serde(default = "default_backoff_limit", rename = "backoffLimit")]
    pub backoff_limit: i32,

    /// ServiceAccount the build pod runs as
    #[serde(default = "default_service_account", rename = "serviceAccountName")]
    pub service_account_name: String,
}

/// Container images used by the build pod
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    /// Init container that writes the Dockerfile into the workspace
    #[serde(default = "default_prepare_image")]
    pub prepare: String,

    /// Rootless BuildKit image that performs the build
    #[serde(default = "default_builder_image")]
    pub builder: String,
}

/// How build Jobs reach the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionMode {
    /// Use the in-cluster service account when present, otherwise skip
    #[default]
    Auto,
    /// Infer credentials from kubeconfig / environment
    Kubeconfig,
    /// Never submit; manifests are only written to disk
    Disabled,
}

/// Cluster submission settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionConfig {
    #[serde(default)]
    pub mode: SubmissionMode,

    /// Upper bound for a single create call
    #[serde(default = "default_submission_timeout", rename = "timeoutSeconds")]
    pub timeout_seconds: u64,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("jobs")
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_ttl() -> i32 {
    300
}

fn default_backoff_limit() -> i32 {
    3
}

fn default_service_account() -> String {
    "default".to_string()
}

fn default_prepare_image() -> String {
    "busybox:latest".to_string()
}

fn default_builder_image() -> String {
    "moby/buildkit:master-rootless".to_string()
}

fn default_submission_timeout() -> u64 {
    10
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            namespace: default_namespace(),
            artifacts_dir: default_artifacts_dir(),
            job: JobConfig::default(),
            images: ImagesConfig::default(),
            submission: SubmissionConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            request_timeout_seconds: default_request_timeout(),
            max_body_bytes: default_body_limit(),
        }
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            ttl_seconds_after_finished: default_ttl(),
            backoff_limit: default_backoff_limit(),
            service_account_name: default_service_account(),
        }
    }
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            prepare: default_prepare_image(),
            builder: default_builder_image(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            mode: SubmissionMode::default(),
            timeout_seconds: default_submission_timeout(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl SubmissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ServiceConfig {
    /// Validate that configuration has usable values
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.namespace.trim().is_empty() {
            return Err(anyhow::anyhow!("namespace must not be empty"));
        }

        if self.images.prepare.trim().is_empty() || self.images.builder.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "images.prepare and images.builder must both be set"
            ));
        }

        if self.job.backoff_limit < 0 {
            return Err(anyhow::anyhow!(
                "job.backoffLimit must be zero or positive, got {}",
                self.job.backoff_limit
            ));
        }

        if self.job.ttl_seconds_after_finished < 0 {
            return Err(anyhow::anyhow!(
                "job.ttlSecondsAfterFinished must be zero or positive, got {}",
                self.job.ttl_seconds_after_finished
            ));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("server.requestTimeoutSeconds must be at least 1"));
        }

        if self.submission.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("submission.timeoutSeconds must be at least 1"));
        }

        Ok(())
    }

    /// Load configuration from mounted ConfigMap file
    pub fn from_mounted_file(config_path: &str) -> Result<Self, anyhow::Error> {
        let config_str = std::fs::read_to_string(config_path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {config_path}: {e}"))?;

        Self::from_yaml(&config_str)
    }

    /// Parse configuration from YAML text. An empty document yields defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, anyhow::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(yaml).map_err(|e| anyhow::anyhow!("Failed to parse config YAML: {e}"))
    }
}
