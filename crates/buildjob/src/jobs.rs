//! Build job creation flow.
//!
//! render → persist → start job logs → submit (once) → record outcome.
//! A persistence failure stops the flow before logs are created or anything
//! is submitted. Submission outcomes never fail the request.

use build_logs::{LogLevel, LogService, SYSTEM_CONTAINER};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::manifest::{self, ArtifactStore, BuildSpec, ManifestSettings};
use crate::submit::{JobSubmitter, SubmissionOutcome};

/// Log line recorded when the cluster accepts a Job.
pub const DEPLOYED_MESSAGE: &str = "Successfully deployed to Kubernetes";

/// A build job that was accepted by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedJob {
    pub job_name: String,
    pub job_id: String,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
    pub manifest_path: PathBuf,
    pub submission: SubmissionOutcome,
}

/// Creates build jobs and owns the services they need.
pub struct BuildJobs {
    logs: LogService,
    submitter: Arc<dyn JobSubmitter>,
    artifacts: ArtifactStore,
    settings: ManifestSettings,
}

impl BuildJobs {
    pub fn new(
        logs: LogService,
        submitter: Arc<dyn JobSubmitter>,
        artifacts: ArtifactStore,
        settings: ManifestSettings,
    ) -> Self {
        Self {
            logs,
            submitter,
            artifacts,
            settings,
        }
    }

    pub fn from_config(
        config: &ServiceConfig,
        logs: LogService,
        submitter: Arc<dyn JobSubmitter>,
    ) -> Self {
        Self::new(
            logs,
            submitter,
            ArtifactStore::new(config.artifacts_dir.clone()),
            ManifestSettings::from(config),
        )
    }

    pub fn logs(&self) -> &LogService {
        &self.logs
    }

    pub fn submitter_name(&self) -> &'static str {
        self.submitter.name()
    }

    pub fn namespace(&self) -> &str {
        &self.settings.namespace
    }

    /// Create a build job from a validated spec.
    #[instrument(skip(self, spec), fields(job = %spec.job_name))]
    pub async fn create(&self, spec: BuildSpec) -> Result<CreatedJob, ApiError> {
        let job = manifest::build_job(&spec, &self.settings);
        let rendered = manifest::render_job(&job)?;
        let manifest_path = self.artifacts.persist(&spec.job_name, &rendered).await?;

        self.logs.create_job_logs(&spec.job_name).await;

        let submission = self.submitter.submit(&job).await;
        self.record_submission(&spec.job_name, &manifest_path, &submission)
            .await;

        let created_at = Utc::now();
        Ok(CreatedJob {
            job_id: format!("build-{}-{}", spec.job_name, created_at.timestamp()),
            job_name: spec.job_name,
            namespace: self.settings.namespace.clone(),
            created_at,
            manifest_path,
            submission,
        })
    }

    async fn record_submission(
        &self,
        job_name: &str,
        manifest_path: &std::path::Path,
        outcome: &SubmissionOutcome,
    ) {
        let recorded = match outcome {
            SubmissionOutcome::Unavailable => {
                info!(
                    job = %job_name,
                    manifest = %manifest_path.display(),
                    "deployment ready; apply manually"
                );
                return;
            }
            SubmissionOutcome::Accepted { .. } => {
                self.logs
                    .add_log_with_level(
                        job_name,
                        SYSTEM_CONTAINER,
                        DEPLOYED_MESSAGE,
                        LogLevel::Info,
                    )
                    .await
            }
            SubmissionOutcome::Rejected { reason } => {
                warn!(job = %job_name, reason = %reason, "build job not deployed");
                self.logs
                    .add_log_with_level(
                        job_name,
                        SYSTEM_CONTAINER,
                        &format!("Warning: Failed to deploy to Kubernetes: {reason}"),
                        LogLevel::Warn,
                    )
                    .await
            }
        };

        if let Err(e) = recorded {
            warn!(job = %job_name, error = %e, "could not record submission outcome");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submit::MockJobSubmitter;
    use build_logs::JOB_CREATED_MESSAGE;

    fn build_jobs(submitter: MockJobSubmitter, dir: &std::path::Path) -> BuildJobs {
        BuildJobs::new(
            LogService::in_memory(),
            Arc::new(submitter),
            ArtifactStore::new(dir),
            ManifestSettings::default(),
        )
    }

    #[tokio::test]
    async fn unavailable_cluster_leaves_only_creation_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut submitter = MockJobSubmitter::new();
        submitter
            .expect_submit()
            .times(1)
            .returning(|_| SubmissionOutcome::Unavailable);
        let jobs = build_jobs(submitter, dir.path());

        let created = jobs.create(BuildSpec::new("offline", "FROM alpine")).await.unwrap();

        assert_eq!(created.submission, SubmissionOutcome::Unavailable);
        assert_eq!(created.namespace, "default");
        assert!(created.job_id.starts_with("build-offline-"));
        assert!(created.manifest_path.exists());

        let entries = jobs.logs().get_job_logs("offline").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, JOB_CREATED_MESSAGE);
    }

    #[tokio::test]
    async fn accepted_submission_is_logged_as_info() {
        let dir = tempfile::tempdir().unwrap();
        let mut submitter = MockJobSubmitter::new();
        submitter
            .expect_submit()
            .withf(|job| job.metadata.name.as_deref() == Some("deployed"))
            .times(1)
            .returning(|job| SubmissionOutcome::Accepted {
                name: job.metadata.name.clone().unwrap_or_default(),
            });
        let jobs = build_jobs(submitter, dir.path());

        jobs.create(BuildSpec::new("deployed", "FROM alpine")).await.unwrap();

        let entries = jobs.logs().get_job_logs("deployed").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].message, DEPLOYED_MESSAGE);
        assert_eq!(entries[1].level, LogLevel::Info);
    }

    #[tokio::test]
    async fn rejected_submission_is_logged_as_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut submitter = MockJobSubmitter::new();
        submitter.expect_submit().times(1).returning(|_| SubmissionOutcome::Rejected {
            reason: "jobs.batch \"dup\" already exists".to_string(),
        });
        let jobs = build_jobs(submitter, dir.path());

        let created = jobs.create(BuildSpec::new("dup", "FROM alpine")).await.unwrap();
        assert!(matches!(created.submission, SubmissionOutcome::Rejected { .. }));

        let entries = jobs.logs().get_job_logs("dup").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].level, LogLevel::Warn);
        assert_eq!(
            entries[1].message,
            "Warning: Failed to deploy to Kubernetes: jobs.batch \"dup\" already exists"
        );
    }

    #[tokio::test]
    async fn persist_failure_aborts_before_logs_and_submission() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let mut submitter = MockJobSubmitter::new();
        submitter.expect_submit().times(0);
        let jobs = build_jobs(submitter, &blocker.path().join("jobs"));

        let err = jobs
            .create(BuildSpec::new("broken", "FROM alpine"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Manifest(_)));
        assert!(!jobs.logs().job_exists("broken").await);
    }

    #[tokio::test]
    async fn persisted_manifest_matches_submitted_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut submitter = MockJobSubmitter::new();
        submitter
            .expect_submit()
            .withf(|job| {
                let expected = manifest::build_job(
                    &BuildSpec::new("same", "FROM alpine\nRUN true"),
                    &ManifestSettings::default(),
                );
                job == &expected
            })
            .returning(|_| SubmissionOutcome::Unavailable);
        let jobs = build_jobs(submitter, dir.path());

        let created = jobs
            .create(BuildSpec::new("same", "FROM alpine\nRUN true"))
            .await
            .unwrap();

        let on_disk = std::fs::read_to_string(created.manifest_path).unwrap();
        let expected = manifest::render(
            &BuildSpec::new("same", "FROM alpine\nRUN true"),
            &ManifestSettings::default(),
        )
        .unwrap();
        assert_eq!(on_disk, expected);
    }
}
