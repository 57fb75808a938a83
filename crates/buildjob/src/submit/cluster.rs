use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::api::{Api, PostParams};
use kube::{Client, Config};
use std::time::Duration;
use tracing::{error, info};

use super::{JobSubmitter, SubmissionOutcome, SubmitError};

/// Creates build Jobs through the Kubernetes batch API.
#[derive(Clone)]
pub struct KubeSubmitter {
    jobs: Api<Job>,
    timeout: Duration,
}

impl KubeSubmitter {
    pub fn new(client: Client, namespace: &str, timeout: Duration) -> Self {
        Self {
            jobs: Api::namespaced(client, namespace),
            timeout,
        }
    }

    /// Use the pod's service account. Fails outside a cluster.
    pub fn in_cluster(namespace: &str, timeout: Duration) -> Result<Self> {
        let config = Config::incluster().context("Not running inside a Kubernetes cluster")?;
        Self::from_kube_config(config, namespace, timeout)
    }

    /// Use kubeconfig / environment discovery.
    pub async fn from_kubeconfig(namespace: &str, timeout: Duration) -> Result<Self> {
        let config = Config::infer()
            .await
            .context("Failed to infer Kubernetes config")?;
        Self::from_kube_config(config, namespace, timeout)
    }

    fn from_kube_config(mut config: Config, namespace: &str, timeout: Duration) -> Result<Self> {
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client, namespace, timeout))
    }
}

#[async_trait]
impl JobSubmitter for KubeSubmitter {
    fn name(&self) -> &'static str {
        "kubernetes"
    }

    async fn submit(&self, job: &Job) -> SubmissionOutcome {
        let job_name = job.metadata.name.clone().unwrap_or_default();

        let created =
            match tokio::time::timeout(self.timeout, self.jobs.create(&PostParams::default(), job))
                .await
            {
                Ok(Ok(created)) => created,
                Ok(Err(e)) => {
                    error!(job = %job_name, error = %e, "Kubernetes rejected build job");
                    return SubmitError::Kube(e).into();
                }
                Err(_) => {
                    error!(
                        job = %job_name,
                        timeout_secs = self.timeout.as_secs(),
                        "Kubernetes API timed out creating build job"
                    );
                    return SubmitError::Timeout(self.timeout).into();
                }
            };

        let name = created.metadata.name.unwrap_or(job_name);
        info!(job = %name, "Build job created in cluster");
        SubmissionOutcome::Accepted { name }
    }
}
