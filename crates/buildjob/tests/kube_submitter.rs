//! Tests for [`KubeSubmitter`] against a fake Kubernetes API server.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use buildjob::{
    manifest, BuildSpec, JobSubmitter, KubeSubmitter, ManifestSettings, SubmissionOutcome,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Copy)]
enum Behavior {
    Accept,
    Conflict,
    Hang,
}

async fn create_job(
    State(behavior): State<Behavior>,
    Path(namespace): Path<String>,
    Json(mut job): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match behavior {
        Behavior::Accept => {
            job["metadata"]["namespace"] = json!(namespace);
            job["metadata"]["uid"] = json!("3f0c5f0e-0000-4000-8000-000000000001");
            (StatusCode::CREATED, Json(job))
        }
        Behavior::Conflict => {
            let name = job["metadata"]["name"].as_str().unwrap_or_default().to_string();
            (
                StatusCode::CONFLICT,
                Json(json!({
                    "kind": "Status",
                    "apiVersion": "v1",
                    "metadata": {},
                    "status": "Failure",
                    "message": format!("jobs.batch \"{name}\" already exists"),
                    "reason": "AlreadyExists",
                    "code": 409
                })),
            )
        }
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            (StatusCode::CREATED, Json(job))
        }
    }
}

async fn start_fake_api(behavior: Behavior) -> SocketAddr {
    let app = Router::new()
        .route("/apis/batch/v1/namespaces/{namespace}/jobs", post(create_job))
        .with_state(behavior);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn submitter_for(addr: SocketAddr, timeout: Duration) -> KubeSubmitter {
    let uri: axum::http::Uri = format!("http://{addr}").parse().unwrap();
    let client = kube::Client::try_from(kube::Config::new(uri)).unwrap();
    KubeSubmitter::new(client, "default", timeout)
}

fn build_job(name: &str) -> k8s_openapi::api::batch::v1::Job {
    manifest::build_job(
        &BuildSpec::new(name, "FROM alpine"),
        &ManifestSettings::default(),
    )
}

#[tokio::test]
async fn accepted_job_reports_its_name() {
    let addr = start_fake_api(Behavior::Accept).await;
    let submitter = submitter_for(addr, Duration::from_secs(5));

    let outcome = submitter.submit(&build_job("accepted")).await;

    assert_eq!(
        outcome,
        SubmissionOutcome::Accepted {
            name: "accepted".to_string()
        }
    );
    assert_eq!(submitter.name(), "kubernetes");
}

#[tokio::test]
async fn conflict_is_reported_as_rejection() {
    let addr = start_fake_api(Behavior::Conflict).await;
    let submitter = submitter_for(addr, Duration::from_secs(5));

    let outcome = submitter.submit(&build_job("dup")).await;

    match outcome {
        SubmissionOutcome::Rejected { reason } => {
            assert!(reason.contains("already exists"), "unexpected reason: {reason}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_api_times_out() {
    let addr = start_fake_api(Behavior::Hang).await;
    let submitter = submitter_for(addr, Duration::from_millis(200));

    let outcome = submitter.submit(&build_job("slow")).await;

    match outcome {
        SubmissionOutcome::Rejected { reason } => {
            assert!(reason.contains("did not answer"), "unexpected reason: {reason}");
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
