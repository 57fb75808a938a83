/*
 * Buildjob - Container Image Build Service
 * Copyright (C) 2025 Buildjob team
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

//! Build log storage for build jobs.
//!
//! Log lines are kept in memory per job, in the order they were appended,
//! and tagged with a severity inferred from their text.
//!
//! # Usage
//!
//! ```
//! use build_logs::{LogLevel, LogService};
//!
//! # async fn demo() -> Result<(), build_logs::LogError> {
//! let logs = LogService::in_memory();
//! logs.create_job_logs("api-image").await;
//! let entry = logs.add_log("api-image", "builder", "ERROR: step 3 failed").await?;
//! assert_eq!(entry.level, LogLevel::Error);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`LogStore`] owns the keyed map behind a single reader/writer lock
//! - [`classify`] maps a message to a [`LogLevel`]
//! - [`LogService`] is the lifecycle API (create, append, read, delete)

pub mod error;
pub mod level;
pub mod service;
pub mod store;

pub use error::LogError;
pub use level::{classify, LogLevel};
pub use service::{LogService, JOB_CREATED_MESSAGE, SYSTEM_CONTAINER};
pub use store::{LogEntry, LogStore};
