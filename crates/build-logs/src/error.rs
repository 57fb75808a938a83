//! Error types for the log store.

use thiserror::Error;

/// Errors returned by log store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// The job has no log history (never created, or deleted)
    #[error("no logs found for job '{0}'")]
    NotFound(String),
}
