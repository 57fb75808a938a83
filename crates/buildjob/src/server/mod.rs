//! HTTP server for the build job API.
//!
//! Routes:
//! - `POST /api/buildjob` creates a build job
//! - `GET /api/buildjob/{job_name}/logs` returns the job's log history
//! - `GET /health` and `GET /ready` for probes

mod handlers;
pub mod types;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::jobs::BuildJobs;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<BuildJobs>,
}

impl AppState {
    pub fn new(jobs: BuildJobs) -> Self {
        Self {
            jobs: Arc::new(jobs),
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route(
            "/api/buildjob",
            post(handlers::create_build_job)
                .fallback(|| async { ApiError::MethodNotAllowed("POST") }),
        )
        .route(
            "/api/buildjob/{job_name}/logs",
            get(handlers::get_job_logs).fallback(|| async { ApiError::MethodNotAllowed("GET") }),
        )
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    config.request_timeout(),
                )),
        )
        .with_state(state)
}

/// Bind `config.listen_addr` and serve until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn run_server(state: AppState, config: &ServerConfig) -> Result<()> {
    let app = build_router(state, config);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("Build job API listening on {}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Build job API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
