//! Build Job manifest generation.
//!
//! A [`BuildSpec`] is turned into a `batch/v1` Job that runs a rootless
//! BuildKit build. An init container writes the Dockerfile into a shared
//! `emptyDir` through a shell here-document terminated by
//! [`DOCKERFILE_SENTINEL`]; the Dockerfile text is embedded as-is.
//!
//! The same [`Job`] value is rendered to YAML for the on-disk artifact and
//! submitted to the cluster, so both always agree.

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, PodSpec, PodTemplateSpec, SeccompProfile,
    SecurityContext, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::config::ServiceConfig;

/// Here-document delimiter wrapping the Dockerfile in the init container.
///
/// Not escaped: a Dockerfile containing a line equal to this token ends the
/// here-document early.
pub const DOCKERFILE_SENTINEL: &str = "EOFLINE";

/// Tag given to every built image.
pub const IMAGE_TAG: &str = "latest";

const WORKSPACE_VOLUME: &str = "workspace";
const WORKSPACE_PATH: &str = "/workspace";
const BUILDKIT_VOLUME: &str = "buildkitd";
const BUILDKIT_STATE_PATH: &str = "/home/user/.local/share/buildkit";
const BUILD_UID: i64 = 1000;

const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
const LABEL_JOB_NAME: &str = "buildjob.dev/job-name";

/// Manifest errors
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to render manifest: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("failed to write manifest {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One build request, consumed by a single job creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub job_name: String,
    pub dockerfile_content: String,
    /// Image repository to produce; defaults to the job name
    pub image_name: Option<String>,
    /// Push the built image to its registry
    pub push: bool,
}

impl BuildSpec {
    pub fn new(job_name: impl Into<String>, dockerfile_content: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            dockerfile_content: dockerfile_content.into(),
            image_name: None,
            push: false,
        }
    }

    /// Full image reference passed to BuildKit, always tagged `:latest`.
    pub fn image_reference(&self) -> String {
        let repository = self
            .image_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.job_name);
        format!("{repository}:{IMAGE_TAG}")
    }
}

/// Static, process-wide settings that shape every rendered Job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSettings {
    pub namespace: String,
    pub ttl_seconds_after_finished: i32,
    pub backoff_limit: i32,
    pub service_account_name: String,
    pub prepare_image: String,
    pub builder_image: String,
}

impl From<&ServiceConfig> for ManifestSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            ttl_seconds_after_finished: config.job.ttl_seconds_after_finished,
            backoff_limit: config.job.backoff_limit,
            service_account_name: config.job.service_account_name.clone(),
            prepare_image: config.images.prepare.clone(),
            builder_image: config.images.builder.clone(),
        }
    }
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self::from(&ServiceConfig::default())
    }
}

/// Shell command run by the init container to materialise the Dockerfile.
pub fn dockerfile_heredoc(dockerfile_content: &str) -> String {
    format!(
        "cat > {WORKSPACE_PATH}/Dockerfile << '{DOCKERFILE_SENTINEL}'\n{dockerfile_content}\n{DOCKERFILE_SENTINEL}"
    )
}

fn build_labels(job_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_MANAGED_BY.to_string(), "buildjob".to_string());
    labels.insert(LABEL_JOB_NAME.to_string(), job_name.to_string());
    labels
}

fn build_security_context() -> SecurityContext {
    SecurityContext {
        run_as_user: Some(BUILD_UID),
        run_as_group: Some(BUILD_UID),
        ..Default::default()
    }
}

/// Build the typed Job for a build request.
pub fn build_job(spec: &BuildSpec, settings: &ManifestSettings) -> Job {
    let labels = build_labels(&spec.job_name);

    let prepare = Container {
        name: "prepare".to_string(),
        image: Some(settings.prepare_image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            dockerfile_heredoc(&spec.dockerfile_content),
        ]),
        security_context: Some(build_security_context()),
        volume_mounts: Some(vec![VolumeMount {
            name: WORKSPACE_VOLUME.to_string(),
            mount_path: WORKSPACE_PATH.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let output = format!(
        "type=image,name={},push={}",
        spec.image_reference(),
        spec.push
    );

    let buildkit = Container {
        name: "buildkit".to_string(),
        image: Some(settings.builder_image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        env: Some(vec![EnvVar {
            name: "BUILDKITD_FLAGS".to_string(),
            value: Some("--oci-worker-no-process-sandbox".to_string()),
            ..Default::default()
        }]),
        command: Some(vec!["buildctl-daemonless.sh".to_string()]),
        args: Some(
            [
                "build",
                "--frontend",
                "dockerfile.v0",
                "--local",
                "context=/workspace",
                "--local",
                "dockerfile=/workspace",
                "--output",
            ]
            .into_iter()
            .map(str::to_string)
            .chain(std::iter::once(output))
            .collect(),
        ),
        security_context: Some(SecurityContext {
            seccomp_profile: Some(SeccompProfile {
                type_: "Unconfined".to_string(),
                ..Default::default()
            }),
            ..build_security_context()
        }),
        volume_mounts: Some(vec![
            VolumeMount {
                name: WORKSPACE_VOLUME.to_string(),
                mount_path: WORKSPACE_PATH.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: BUILDKIT_VOLUME.to_string(),
                mount_path: BUILDKIT_STATE_PATH.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    };

    let volumes = [WORKSPACE_VOLUME, BUILDKIT_VOLUME]
        .into_iter()
        .map(|name| Volume {
            name: name.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        })
        .collect();

    Job {
        metadata: ObjectMeta {
            name: Some(spec.job_name.clone()),
            namespace: Some(settings.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            ttl_seconds_after_finished: Some(settings.ttl_seconds_after_finished),
            backoff_limit: Some(settings.backoff_limit),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(spec.job_name.clone()),
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    service_account_name: Some(settings.service_account_name.clone()),
                    restart_policy: Some("Never".to_string()),
                    init_containers: Some(vec![prepare]),
                    containers: vec![buildkit],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Render the Job manifest as YAML text.
///
/// Pure: equal inputs always produce byte-identical output.
pub fn render(spec: &BuildSpec, settings: &ManifestSettings) -> Result<String, ManifestError> {
    render_job(&build_job(spec, settings))
}

/// Serialize an already built Job.
pub fn render_job(job: &Job) -> Result<String, ManifestError> {
    Ok(serde_yaml::to_string(job)?)
}

/// Directory of rendered manifests, one `<job>.yaml` per job.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where the manifest for `job_name` lives.
    pub fn path_for(&self, job_name: &str) -> PathBuf {
        self.dir.join(format!("{job_name}.yaml"))
    }

    /// Write a rendered manifest, creating the directory if needed.
    pub async fn persist(&self, job_name: &str, manifest: &str) -> Result<PathBuf, ManifestError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ManifestError::Persist {
                path: self.dir.clone(),
                source,
            })?;

        let path = self.path_for(job_name);
        tokio::fs::write(&path, manifest)
            .await
            .map_err(|source| ManifestError::Persist {
                path: path.clone(),
                source,
            })?;

        debug!(job = %job_name, path = %path.display(), "manifest written");
        Ok(path)
    }
}
