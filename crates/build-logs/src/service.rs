//! Log lifecycle API used by the request handlers.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::LogError;
use crate::level::{classify, LogLevel};
use crate::store::{LogEntry, LogStore};

/// Container name used for entries the service writes itself.
pub const SYSTEM_CONTAINER: &str = "system";

/// Message of the entry written when a job's logs are created.
pub const JOB_CREATED_MESSAGE: &str = "Build job created successfully";

/// Facade over a shared [`LogStore`] that classifies messages on the way in.
///
/// Cloning is cheap; clones share the same store.
#[derive(Debug, Clone)]
pub struct LogService {
    store: Arc<LogStore>,
}

impl LogService {
    /// Wrap an existing store.
    #[must_use]
    pub fn new(store: Arc<LogStore>) -> Self {
        Self { store }
    }

    /// Service backed by a fresh, empty store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(LogStore::new()))
    }

    /// Start a job's log history and record the creation entry.
    ///
    /// An existing history is kept; the creation entry is appended to it.
    /// An empty identifier is ignored and no history is created.
    pub async fn create_job_logs(&self, job: &str) {
        if job.is_empty() {
            warn!("refusing to create logs for an empty job identifier");
            return;
        }

        let created = self.store.create(job).await;
        if !created {
            debug!(job = %job, "job logs already present, appending creation entry");
        }

        // A concurrent delete can land between the two calls; it wins.
        if let Err(e) = self
            .add_log_with_level(job, SYSTEM_CONTAINER, JOB_CREATED_MESSAGE, LogLevel::Info)
            .await
        {
            debug!(job = %job, error = %e, "job logs deleted before creation entry");
        }

        info!(job = %job, "job logs created");
    }

    /// Append a message, inferring its level.
    pub async fn add_log(
        &self,
        job: &str,
        container: &str,
        message: &str,
    ) -> Result<LogEntry, LogError> {
        self.add_log_with_level(job, container, message, classify(message))
            .await
    }

    /// Append a message with an explicit level.
    pub async fn add_log_with_level(
        &self,
        job: &str,
        container: &str,
        message: &str,
        level: LogLevel,
    ) -> Result<LogEntry, LogError> {
        self.store.append(job, container, message, level).await
    }

    pub async fn get_job_logs(&self, job: &str) -> Option<Vec<LogEntry>> {
        self.store.read(job).await
    }

    /// Remove a job's history. Deleting an unknown job is a no-op.
    pub async fn delete_job_logs(&self, job: &str) -> bool {
        let removed = self.store.delete(job).await;
        if removed {
            info!(job = %job, "job logs deleted");
        }
        removed
    }

    pub async fn job_exists(&self, job: &str) -> bool {
        self.store.exists(job).await
    }

    pub async fn job_count(&self) -> usize {
        self.store.job_count().await
    }
}
