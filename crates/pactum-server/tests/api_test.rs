//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use pactum_core::pactum_extractors::RawDocument;
use pactum_core::strategies::PatternStrategy;
use pactum_core::{
    ExtractedField, ExtractionStrategy, PactumConfig, PactumResult, PactumRuntime, StrategyKind,
    Stores,
};
use pactum_server::{create_server, AppState};
use serde_json::Value;
use tower::ServiceExt;

const BOUNDARY: &str = "pactum-test-boundary";

/// Strategy that takes a while, keeping jobs in `processing`.
struct Slow;

#[async_trait]
impl ExtractionStrategy for Slow {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Semantic
    }

    async fn extract(&self, _document: &RawDocument) -> PactumResult<Vec<ExtractedField>> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(Vec::new())
    }
}

async fn app_with(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Router {
    let mut config = PactumConfig::default();
    config.worker.worker_count = 2;
    let runtime = PactumRuntime::with_strategies(config, Stores::in_memory(), strategies)
        .await
        .unwrap();
    create_server(AppState::new(runtime))
}

async fn app() -> Router {
    app_with(vec![Arc::new(PatternStrategy::new())]).await
}

fn upload(filename: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n",
        b = BOUNDARY,
        f = filename,
        c = content_type
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/contracts")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn submit(app: &Router, bytes: &[u8]) -> String {
    let (status, body) = send(app, upload("msa.txt", "text/plain", bytes)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{}", body);
    body["job_id"].as_str().unwrap().to_string()
}

async fn wait_until(app: &Router, id: &str, wanted: &str) {
    for _ in 0..100 {
        let (_, body) = send(app, get(&format!("/contracts/{}/status", id))).await;
        if body["status"] == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job {} never reached {}", id, wanted);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app().await, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["workers"], 2);
    assert_eq!(body["pending_jobs"], 0);
    assert_eq!(body["processing_jobs"], 0);
}

#[tokio::test]
async fn test_health_reports_running_jobs() {
    let app = app_with(vec![Arc::new(Slow)]).await;
    let id = submit(&app, b"Net 30").await;
    wait_until(&app, &id, "processing").await;

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["processing_jobs"], 1);
    assert_eq!(body["pending_jobs"], 0);
}

#[tokio::test]
async fn test_submit_poll_and_fetch_result() {
    let app = app().await;
    let id = submit(&app, b"Invoices are payable Net 30.").await;
    wait_until(&app, &id, "completed").await;

    let (status, body) = send(&app, get(&format!("/contracts/{}/status", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["progress"], 100);

    let (status, body) = send(&app, get(&format!("/contracts/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["payment_terms"]["value"], "Net 30");
    assert_eq!(body["result"]["payment_terms"]["source"], "pattern");
    let gaps: Vec<&str> = body["gaps"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(gaps.contains(&"customer_name"));
    assert!(!gaps.contains(&"payment_terms"));
}

#[tokio::test]
async fn test_result_before_completion_is_unprocessable() {
    let app = app_with(vec![Arc::new(Slow)]).await;
    let id = submit(&app, b"Net 30").await;

    let (status, body) = send(&app, get(&format!("/contracts/{}", id))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "JOB_003");
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn test_rejected_uploads() {
    let app = app().await;

    let (status, body) = send(&app, upload("msa.doc", "application/msword", b"PK\x03\x04")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_002");

    let (status, body) = send(&app, upload("empty.txt", "text/plain", b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_003");

    let request = Request::post("/contracts")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(format!("--{}--\r\n", BOUNDARY)))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let app = app().await;
    for uri in [
        "/contracts/nope",
        "/contracts/nope/status",
        "/contracts/nope/download",
    ] {
        let (status, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_download_returns_original() {
    let app = app().await;
    let id = submit(&app, b"Net 30 original bytes").await;

    let response = app
        .clone()
        .oneshot(get(&format!("/contracts/{}/download", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"msa.txt\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"Net 30 original bytes");
}

#[tokio::test]
async fn test_failed_job_conflict_and_retry() {
    let app = app().await;
    let id = submit(&app, b"   \n\t").await;
    wait_until(&app, &id, "failed").await;

    let (status, body) = send(&app, get(&format!("/contracts/{}", id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["details"]["status"], "failed");

    let retry = Request::post(format!("/contracts/{}/retry", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, retry).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_ne!(body["job_id"], id.as_str());
}

#[tokio::test]
async fn test_list_with_filters() {
    let app = app().await;
    let id = submit(&app, b"Net 30").await;
    wait_until(&app, &id, "completed").await;

    let (status, body) = send(&app, get("/contracts?status=completed&limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["items"][0]["id"], id.as_str());

    let (_, body) = send(&app, get("/contracts?status=failed")).await;
    assert_eq!(body["total"], 0);
}
