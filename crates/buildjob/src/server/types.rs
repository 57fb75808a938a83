//! Request and response bodies of the build job API.

use build_logs::LogEntry;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::jobs::CreatedJob;
use crate::manifest::BuildSpec;

/// `POST /api/buildjob` body.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BuildJobRequest {
    #[serde(default)]
    pub job_name: String,
    #[serde(default)]
    pub dockerfile_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_registry: Option<bool>,
}

impl BuildJobRequest {
    /// Check required fields and turn the request into a [`BuildSpec`].
    pub fn into_spec(self) -> Result<BuildSpec, ApiError> {
        if self.job_name.is_empty() || self.dockerfile_content.is_empty() {
            return Err(ApiError::Validation(
                "job_name and dockerfile_content are required".to_string(),
            ));
        }

        // The job name also names the manifest file.
        if self.job_name == "."
            || self.job_name == ".."
            || self.job_name.contains(['/', '\\'])
        {
            return Err(ApiError::Validation(format!(
                "job_name '{}' must not contain path separators",
                self.job_name
            )));
        }

        Ok(BuildSpec {
            job_name: self.job_name,
            dockerfile_content: self.dockerfile_content,
            image_name: self.image_name,
            push: self.push_registry.unwrap_or(false),
        })
    }
}

/// `POST /api/buildjob` success body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildJobResponse {
    pub status: String,
    pub message: String,
    pub job_name: String,
    pub job_id: String,
    pub namespace: String,
    pub created_at: String,
}

impl From<CreatedJob> for BuildJobResponse {
    fn from(job: CreatedJob) -> Self {
        Self {
            status: "created".to_string(),
            message: "Build job created successfully".to_string(),
            job_name: job.job_name,
            job_id: job.job_id,
            namespace: job.namespace,
            created_at: job.created_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}

/// `GET /api/buildjob/{job_name}/logs` body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogsResponse {
    pub job_name: String,
    pub status: String,
    pub logs: Vec<LogEntry>,
    pub total_lines: usize,
}

impl LogsResponse {
    pub fn running(job_name: String, logs: Vec<LogEntry>) -> Self {
        Self {
            job_name,
            status: "running".to_string(),
            total_lines: logs.len(),
            logs,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
