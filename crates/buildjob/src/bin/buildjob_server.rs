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

//! Build job API server.
//!
//! Loads the service configuration, wires the log store, manifest writer and
//! cluster submitter together, and serves the HTTP API until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use build_logs::{LogService, LogStore};
use buildjob::{config::ServiceConfig, submit, AppState, BuildJobs, LogFormat, SubmissionMode};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "buildjob-server")]
#[command(about = "HTTP API that turns Dockerfiles into Kubernetes build Jobs")]
#[command(version)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "BUILDJOB_CONFIG", default_value = "/config/config.yaml")]
    config: PathBuf,

    /// Address to listen on (overrides server.listenAddr)
    #[arg(long, env = "BUILDJOB_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// Directory rendered manifests are written to (overrides artifactsDir)
    #[arg(long, env = "BUILDJOB_ARTIFACTS_DIR")]
    artifacts_dir: Option<PathBuf>,

    /// Namespace build Jobs are created in (overrides namespace)
    #[arg(long, env = "BUILDJOB_NAMESPACE")]
    namespace: Option<String>,

    /// Cluster submission mode (overrides submission.mode)
    #[arg(long, env = "BUILDJOB_SUBMISSION_MODE", value_enum)]
    submission: Option<SubmissionMode>,

    /// Format of the service's own logs
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "text")]
    log_format: LogFormat,
}

impl Cli {
    fn apply_overrides(self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(addr) = self.listen_addr {
            config.server.listen_addr = addr;
        }
        if let Some(dir) = self.artifacts_dir {
            config.artifacts_dir = dir;
        }
        if let Some(namespace) = self.namespace {
            config.namespace = namespace;
        }
        if let Some(mode) = self.submission {
            config.submission.mode = mode;
        }
        config
    }
}

fn load_config(path: &Path) -> Result<ServiceConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using default configuration",
            path.display()
        );
        return Ok(ServiceConfig::default());
    }

    let path_str = path
        .to_str()
        .with_context(|| format!("Config path {} is not valid UTF-8", path.display()))?;
    let config = ServiceConfig::from_mounted_file(path_str)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    buildjob::init_tracing(cli.log_format)?;

    info!("Starting build job API v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli.config)?;
    let config = cli.apply_overrides(config);
    config.validate().context("Invalid configuration")?;

    info!(
        namespace = %config.namespace,
        artifacts_dir = %config.artifacts_dir.display(),
        submission = ?config.submission.mode,
        "Configuration ready"
    );

    let logs = LogService::new(Arc::new(LogStore::new()));
    let submitter = submit::from_config(&config.submission, &config.namespace).await;
    let jobs = BuildJobs::from_config(&config, logs, submitter);

    buildjob::run_server(AppState::new(jobs), &config.server).await
}
