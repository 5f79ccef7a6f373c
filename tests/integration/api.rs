//! API integration tests.
//!
//! These tests drive the router directly with `oneshot` requests.

use crate::common::in_ms;

use ferry::ConnectionRegistry;
use ferry::Scheduler;
use ferry::api::{ApiState, build_router};
use ferry::testing::RecordingExecutor;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

/// Create a router over an empty registry.
fn create_test_router(executor: Arc<RecordingExecutor>) -> Router {
    let registry = Arc::new(ConnectionRegistry::new(Scheduler::new(executor), None));
    build_router(ApiState::new(registry))
}

/// Send one request and decode the JSON body.
async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn create_connection(router: &Router, id: &str) -> Value {
    let (status, json) = send(
        router,
        Method::POST,
        "/api/v1/connection",
        Some(json!({
            "id": id,
            "name": "Mirror",
            "server_address": "ftp.example.com:21",
            "username": "mirror",
            "password": "hunter2",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

async fn create_job(router: &Router, connection_id: &str) -> Value {
    let (status, json) = send(
        router,
        Method::POST,
        &format!("/api/v1/connection/{}/jobs", connection_id),
        Some(json!({
            "remote_dir": "/pub",
            "local_dir": "/tmp/in",
            "file_name": "index.txt",
            "direction": "download",
            "start_at": in_ms(60_000),
            "interval_ms": 3_600_000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

/// Test: Health endpoint responds with status ok.
#[tokio::test]
async fn test_health_endpoint() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));

    let (status, json) = send(&router, Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

/// Test: Created connections are listed without their password.
#[tokio::test]
async fn test_create_and_list_connections() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));

    let created = create_connection(&router, "mirror").await;
    assert_eq!(created["id"], "mirror");
    assert_eq!(created["job_count"], 0);
    assert!(created.get("password").is_none());

    let (status, json) = send(&router, Method::GET, "/api/v1/connections", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["connections"][0]["server_address"], "ftp.example.com:21");
    assert!(!json.to_string().contains("hunter2"));
}

/// Test: A duplicate connection ID is a conflict.
#[tokio::test]
async fn test_duplicate_connection_is_conflict() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));
    create_connection(&router, "dup").await;

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/v1/connection",
        Some(json!({
            "id": "dup",
            "name": "Again",
            "server_address": "other:21",
            "username": "u",
            "password": "p",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

/// Test: An empty server address is rejected.
#[tokio::test]
async fn test_empty_server_address_is_bad_request() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/v1/connection",
        Some(json!({
            "name": "Nowhere",
            "server_address": "  ",
            "username": "u",
            "password": "p",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

/// Test: IDs that cannot name a stored document are rejected up front.
#[tokio::test]
async fn test_unusable_connection_id_is_bad_request() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));

    for id in ["a/b", ".x", "..\\y"] {
        let (status, json) = send(
            &router,
            Method::POST,
            "/api/v1/connection",
            Some(json!({
                "id": id,
                "name": "Bad",
                "server_address": "ftp.example.com:21",
                "username": "u",
                "password": "p",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", id);
        assert_eq!(json["code"], "BAD_REQUEST");
    }

    let (_, list) = send(&router, Method::GET, "/api/v1/connections", None).await;
    assert_eq!(list["count"], 0);
}

/// Test: Unknown connections return 404.
#[tokio::test]
async fn test_unknown_connection_is_not_found() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));

    for uri in [
        "/api/v1/connection/nope",
        "/api/v1/connection/nope/jobs",
        "/api/v1/connection/nope/job/x",
    ] {
        let (status, json) = send(&router, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(json["code"], "NOT_FOUND");
    }
}

/// Test: A job can be created, read back and listed.
#[tokio::test]
async fn test_create_get_and_list_jobs() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));
    create_connection(&router, "c1").await;

    let job = create_job(&router, "c1").await;
    let job_id = job["id"].as_str().unwrap().to_string();
    assert_eq!(job["state"], "armed");
    assert_eq!(job["interval_ms"], 3_600_000);
    assert_eq!(job["direction"], "download");
    assert_eq!(job["run_count"], 0);

    let (status, fetched) = send(
        &router,
        Method::GET,
        &format!("/api/v1/connection/c1/job/{}", job_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["file_name"], "index.txt");
    assert_eq!(fetched["remote_dir"], "/pub");

    let (_, list) = send(&router, Method::GET, "/api/v1/connection/c1/jobs", None).await;
    assert_eq!(list["count"], 1);
    assert_eq!(list["jobs"][0]["id"], job_id.as_str());

    let (_, detail) = send(&router, Method::GET, "/api/v1/connection/c1", None).await;
    assert_eq!(detail["job_count"], 1);
    assert_eq!(detail["jobs"][0]["id"], job_id.as_str());
}

/// Test: Invalid job descriptors are rejected with 400.
#[tokio::test]
async fn test_invalid_job_is_bad_request() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));
    create_connection(&router, "c1").await;

    let (status, json) = send(
        &router,
        Method::POST,
        "/api/v1/connection/c1/jobs",
        Some(json!({
            "file_name": "a.txt",
            "direction": "upload",
            "start_at": in_ms(1000),
            "interval_ms": -1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("negative"));

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/connection/c1/jobs",
        Some(json!({
            "file_name": "",
            "direction": "upload",
            "start_at": in_ms(1000),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&router, Method::GET, "/api/v1/connection/c1/jobs", None).await;
    assert_eq!(list["count"], 0);
}

/// Test: Cancel keeps the job listed; delete removes it.
#[tokio::test]
async fn test_cancel_then_delete_job() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));
    create_connection(&router, "c1").await;
    let job = create_job(&router, "c1").await;
    let job_id = job["id"].as_str().unwrap().to_string();

    let (status, json) = send(
        &router,
        Method::POST,
        &format!("/api/v1/connection/c1/job/{}/cancel", job_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "cancelled");
    assert_eq!(json["job"]["state"], "cancelled");
    assert_eq!(json["job"]["interval_ms"], 0);

    let (_, json) = send(
        &router,
        Method::POST,
        &format!("/api/v1/connection/c1/job/{}/cancel", job_id),
        None,
    )
    .await;
    assert_eq!(json["outcome"], "already_finished");

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/api/v1/connection/c1/job/{}", job_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/v1/connection/c1/job/{}", job_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test: Deleting a connection removes it from the listing.
#[tokio::test]
async fn test_delete_connection() {
    let router = create_test_router(Arc::new(RecordingExecutor::new()));
    create_connection(&router, "c1").await;
    create_job(&router, "c1").await;

    let (status, json) = send(&router, Method::DELETE, "/api/v1/connection/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("c1"));

    let (_, list) = send(&router, Method::GET, "/api/v1/connections", None).await;
    assert_eq!(list["count"], 0);

    let (status, _) = send(&router, Method::DELETE, "/api/v1/connection/c1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Test: Login goes through the executor; failures map to 502.
#[tokio::test]
async fn test_login_endpoint() {
    let executor = Arc::new(RecordingExecutor::new());
    let router = create_test_router(executor.clone());
    create_connection(&router, "c1").await;

    let (status, _) = send(&router, Method::POST, "/api/v1/connection/c1/login", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(executor.logins().len(), 1);

    executor.fail_with("530 Login incorrect");
    let (status, json) = send(&router, Method::POST, "/api/v1/connection/c1/login", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("530"));
}

/// Test: Remote directory listings are returned as names.
#[tokio::test]
async fn test_list_files_endpoint() {
    let executor = Arc::new(
        RecordingExecutor::new().with_remote_entries(vec!["a.csv".to_string(), "b.csv".to_string()]),
    );
    let router = create_test_router(executor);
    create_connection(&router, "c1").await;

    let (status, json) = send(
        &router,
        Method::GET,
        "/api/v1/connection/c1/files?path=/outgoing",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["path"], "/outgoing");
    assert_eq!(json["count"], 2);
    assert_eq!(json["entries"], json!(["a.csv", "b.csv"]));
}
