//! Severity classification for free-text log lines.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity attached to every stored log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase wire name (`info`, `warn`, `error`).
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer a severity from message text.
///
/// Case-insensitive substring match, first rule wins:
/// `error` or `failed` is [`LogLevel::Error`], then `warn` is
/// [`LogLevel::Warn`], anything else is [`LogLevel::Info`].
pub fn classify(message: &str) -> LogLevel {
    let lower = message.to_lowercase();

    if lower.contains("error") || lower.contains("failed") {
        return LogLevel::Error;
    }

    if lower.contains("warn") {
        return LogLevel::Warn;
    }

    LogLevel::Info
}
