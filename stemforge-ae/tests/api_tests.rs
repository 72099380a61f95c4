//! HTTP API integration tests

mod helpers;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use helpers::*;
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::Path;
use tower::ServiceExt;
use uuid::Uuid;

use stemforge_ae::{build_router, AppState};

const BOUNDARY: &str = "stemforge-test-boundary";

fn test_app(jobs_root: &Path) -> (axum::Router, std::sync::Arc<stemforge_ae::storage::JobStorage>)
{
    let (manager, storage) = build_test_manager(jobs_root, 1, stub_engines());
    (build_router(AppState::new(manager)), storage)
}

fn multipart_body(file_name: &str, bytes: &[u8], model: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
    if let Some(model) = model {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"model\"\r\n\r\n");
        body.extend_from_slice(model.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn submit_request(file_name: &str, bytes: &[u8], model: Option<&str>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(file_name, bytes, model)))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _storage) = test_app(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "stemforge-ae");
}

#[tokio::test(flavor = "multi_thread")]
async fn submit_returns_job_id_and_status_is_pollable() {
    let dir = tempfile::tempdir().unwrap();
    let (app, storage) = test_app(dir.path());

    let response = app
        .clone()
        .oneshot(submit_request("clip.wav", b"RIFF....", Some("htdemucs")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();

    let record = wait_for_terminal(&storage, job_id).await;
    assert_eq!(record.state, stemforge_ae::models::JobState::Success);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/jobs/{}", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["state"], "success");
    assert_eq!(body["progress"], 100);
    assert_eq!(body["artifacts"]["stems"].as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn submit_empty_file_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _storage) = test_app(dir.path());

    let response = app
        .oneshot(submit_request("clip.wav", b"", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn submit_without_file_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _storage) = test_app(dir.path());

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    let request = Request::builder()
        .method("POST")
        .uri("/api/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_job_status_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _storage) = test_app(dir.path());

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/jobs/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_a_terminal_job_is_a_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let (app, storage) = test_app(dir.path());

    let response = app
        .clone()
        .oneshot(submit_request("clip.wav", b"RIFF....", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    let job_id: Uuid = body["job_id"].as_str().unwrap().parse().unwrap();
    wait_for_terminal(&storage, job_id).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/jobs/{}/cancel", job_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");
}
