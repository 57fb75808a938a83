//! Best-effort submission of build Jobs to a Kubernetes cluster.
//!
//! Submission is advisory: the rendered manifest on disk already satisfies
//! "job created". A [`JobSubmitter`] reports what happened as a
//! [`SubmissionOutcome`] instead of failing, and is tried exactly once per
//! request with no retries.
//!
//! - [`UnavailableSubmitter`] is used when there is no cluster access
//! - [`KubeSubmitter`] creates the Job through the Kubernetes API

mod cluster;

pub use cluster::KubeSubmitter;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{SubmissionConfig, SubmissionMode};

/// Why a live submission did not go through.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("failed to create kubernetes job: {0}")]
    Kube(#[from] kube::Error),

    #[error("kubernetes API did not answer within {0:?}")]
    Timeout(Duration),
}

/// Result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// No cluster access; the manifest has to be applied by hand
    Unavailable,
    /// The cluster accepted the Job
    Accepted { name: String },
    /// The cluster was reachable but the Job was not created
    Rejected { reason: String },
}

impl From<SubmitError> for SubmissionOutcome {
    fn from(err: SubmitError) -> Self {
        SubmissionOutcome::Rejected {
            reason: err.to_string(),
        }
    }
}

/// Capability to hand a Job to a cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Short name for logs and the readiness endpoint.
    fn name(&self) -> &'static str;

    /// Attempt to create `job` once.
    async fn submit(&self, job: &Job) -> SubmissionOutcome;
}

/// Submitter used when no cluster is reachable or submission is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSubmitter;

#[async_trait]
impl JobSubmitter for UnavailableSubmitter {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    async fn submit(&self, _job: &Job) -> SubmissionOutcome {
        SubmissionOutcome::Unavailable
    }
}

/// Pick a submitter for the configured mode.
///
/// Missing cluster credentials are expected outside a cluster and fall back
/// to [`UnavailableSubmitter`].
pub async fn from_config(config: &SubmissionConfig, namespace: &str) -> Arc<dyn JobSubmitter> {
    let timeout = config.timeout();

    let built = match config.mode {
        SubmissionMode::Disabled => {
            info!("Cluster submission disabled; manifests will only be written to disk");
            return Arc::new(UnavailableSubmitter);
        }
        SubmissionMode::Auto => KubeSubmitter::in_cluster(namespace, timeout),
        SubmissionMode::Kubeconfig => KubeSubmitter::from_kubeconfig(namespace, timeout).await,
    };

    match built {
        Ok(submitter) => {
            info!(
                namespace = %namespace,
                timeout_secs = timeout.as_secs(),
                "Kubernetes submission enabled"
            );
            Arc::new(submitter)
        }
        Err(e) => {
            warn!(
                mode = ?config.mode,
                error = %e,
                "No Kubernetes access; build jobs must be applied manually"
            );
            Arc::new(UnavailableSubmitter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unavailable_submitter_never_submits() {
        let outcome = UnavailableSubmitter.submit(&Job::default()).await;
        assert_eq!(outcome, SubmissionOutcome::Unavailable);
        assert_eq!(UnavailableSubmitter.name(), "unavailable");
    }

    #[tokio::test]
    async fn disabled_mode_selects_unavailable_submitter() {
        let config = SubmissionConfig {
            mode: SubmissionMode::Disabled,
            ..SubmissionConfig::default()
        };
        let submitter = from_config(&config, "default").await;
        assert_eq!(submitter.name(), "unavailable");
    }

    #[test]
    fn timeout_becomes_rejection() {
        let outcome = SubmissionOutcome::from(SubmitError::Timeout(Duration::from_secs(10)));
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                reason: "kubernetes API did not answer within 10s".to_string()
            }
        );
    }
}
