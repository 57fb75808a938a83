//! Keyed, append-only log storage shared across request handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::LogError;
use crate::level::LogLevel;

/// A single stored log line. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    /// Logical source of the line (`system`, `builder`, ...)
    pub container: String,
    /// Raw message text
    pub message: String,
    /// Severity
    pub level: LogLevel,
}

/// In-memory log store keyed by job identifier.
///
/// One lock covers the whole map: `read`/`exists` share it, `create`,
/// `append` and `delete` take it exclusively. Nothing awaits while holding
/// it, so every critical section is bounded.
#[derive(Debug, Default)]
pub struct LogStore {
    jobs: RwLock<HashMap<String, Vec<LogEntry>>>,
}

impl LogStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty log history for `job`.
    ///
    /// Returns `false` if the job already had one, which is left untouched.
    pub async fn create(&self, job: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(job) {
            debug!(job = %job, "log history already exists, keeping it");
            return false;
        }
        jobs.insert(job.to_string(), Vec::new());
        true
    }

    /// Append an entry stamped with the current time.
    pub async fn append(
        &self,
        job: &str,
        container: &str,
        message: &str,
        level: LogLevel,
    ) -> Result<LogEntry, LogError> {
        let mut jobs = self.jobs.write().await;
        let entries = jobs
            .get_mut(job)
            .ok_or_else(|| LogError::NotFound(job.to_string()))?;

        let entry = LogEntry {
            timestamp: Utc::now(),
            container: container.to_string(),
            message: message.to_string(),
            level,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    /// Snapshot of a job's entries in append order, `None` if unknown.
    pub async fn read(&self, job: &str) -> Option<Vec<LogEntry>> {
        self.jobs.read().await.get(job).cloned()
    }

    /// Drop a job's history. Returns whether anything was removed.
    pub async fn delete(&self, job: &str) -> bool {
        self.jobs.write().await.remove(job).is_some()
    }

    pub async fn exists(&self, job: &str) -> bool {
        self.jobs.read().await.contains_key(job)
    }

    /// Number of jobs with a log history.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_is_idempotent_and_preserves_entries() {
        let store = LogStore::new();
        assert!(store.create("job-a").await);
        store
            .append("job-a", "builder", "step 1", LogLevel::Info)
            .await
            .unwrap();

        assert!(!store.create("job-a").await);

        let entries = store.read("job-a").await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "step 1");
    }

    #[tokio::test]
    async fn append_to_unknown_job_is_not_found() {
        let store = LogStore::new();
        let err = store
            .append("ghost", "builder", "hello", LogLevel::Info)
            .await
            .unwrap_err();

        assert_eq!(err, LogError::NotFound("ghost".to_string()));
        assert!(!store.exists("ghost").await);
    }

    #[tokio::test]
    async fn read_preserves_append_order() {
        let store = LogStore::new();
        store.create("job-b").await;
        for (message, level) in [
            ("third-level", LogLevel::Error),
            ("first-level", LogLevel::Info),
            ("second-level", LogLevel::Warn),
        ] {
            store.append("job-b", "builder", message, level).await.unwrap();
        }

        let messages: Vec<String> = store
            .read("job-b")
            .await
            .unwrap()
            .into_iter()
            .map(|entry| entry.message)
            .collect();
        assert_eq!(messages, ["third-level", "first-level", "second-level"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = LogStore::new();
        store.create("job-c").await;

        assert!(store.delete("job-c").await);
        assert!(!store.delete("job-c").await);
        assert!(store.read("job-c").await.is_none());
        assert_eq!(store.job_count().await, 0);
    }

    #[tokio::test]
    async fn jobs_are_isolated() {
        let store = LogStore::new();
        store.create("left").await;
        store.create("right").await;
        store
            .append("left", "builder", "only left", LogLevel::Info)
            .await
            .unwrap();

        assert_eq!(store.read("left").await.unwrap().len(), 1);
        assert!(store.read("right").await.unwrap().is_empty());
        assert_eq!(store.job_count().await, 2);
    }

    #[tokio::test]
    async fn entry_serializes_with_rfc3339_timestamp() {
        let store = LogStore::new();
        store.create("job-d").await;
        let entry = store
            .append("job-d", "system", "ready", LogLevel::Info)
            .await
            .unwrap();

        let json = serde_json::to_value(&entry).unwrap();
        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
        assert_eq!(json["level"], "info");
        assert_eq!(json["container"], "system");
    }
}
