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

//! Build job API.
//!
//! Accepts Dockerfile builds over HTTP, renders each one into a Kubernetes
//! batch Job running rootless BuildKit, writes the manifest to disk, submits
//! it to the cluster when one is reachable, and serves per-job log history.

pub mod config;
pub mod error;
pub mod jobs;
pub mod manifest;
pub mod server;
pub mod submit;
pub mod telemetry;

pub use config::{ServiceConfig, SubmissionMode};
pub use error::ApiError;
pub use jobs::{BuildJobs, CreatedJob};
pub use manifest::{ArtifactStore, BuildSpec, ManifestError, ManifestSettings};
pub use server::{build_router, run_server, AppState};
pub use submit::{JobSubmitter, KubeSubmitter, SubmissionOutcome, UnavailableSubmitter};
pub use telemetry::{init_tracing, LogFormat};
