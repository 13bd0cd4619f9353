//! Integration tests for postula-desk API endpoints
//!
//! Tests cover:
//! - Health endpoint
//! - Form session: submit (create/update/reject), edit, clear
//! - Candidate deletion
//! - Store failures and malformed requests
//! - SSE snapshot feed

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use postula_common::events::EventBus;
use postula_common::{
    Candidate, CandidateStore, MemoryStore, RecordId, Snapshot, StoreError, StoreResult,
};
use postula_desk::{build_router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

/// Test helper: app over a fresh in-memory store
fn setup_app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let app = build_router(AppState::new(store.clone()));
    (store, app)
}

/// Test double: MemoryStore whose mutations and reads fail on demand
struct FlakyStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StoreError::Failure("connection reset".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CandidateStore for FlakyStore {
    async fn create(&self, candidate: &Candidate) -> StoreResult<RecordId> {
        self.check()?;
        self.inner.create(candidate).await
    }

    async fn read_one(&self, id: RecordId) -> StoreResult<Candidate> {
        self.check()?;
        self.inner.read_one(id).await
    }

    async fn update(&self, id: RecordId, candidate: &Candidate) -> StoreResult<()> {
        self.check()?;
        self.inner.update(id, candidate).await
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn snapshot(&self) -> StoreResult<Snapshot> {
        self.check()?;
        self.inner.snapshot().await
    }

    fn events(&self) -> &EventBus {
        self.inner.events()
    }
}

fn setup_flaky_app() -> (Arc<FlakyStore>, Router) {
    let store = Arc::new(FlakyStore::new());
    let app = build_router(AppState::new(store.clone()));
    (store, app)
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

fn valid_form() -> Value {
    json!({
        "national_id": "12345678-5",
        "full_name": "Fernanda Muñoz",
        "email": "fmunoz@example.cl",
        "phone": "+56 9 5555 1234",
        "position": "Diseñadora UX"
    })
}

fn stored(name: &str) -> Candidate {
    Candidate {
        national_id: "6-k".to_string(),
        full_name: name.to_string(),
        email: "stored@example.cl".to_string(),
        phone: "123".to_string(),
        position: "Ventas".to_string(),
    }
}

// =============================================================================
// Health Endpoint
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_store, app) = setup_app();

    let response = app.oneshot(test_request("GET", "/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "postula-desk");
    assert!(body["version"].is_string());
}

// =============================================================================
// Form Session
// =============================================================================

#[tokio::test]
async fn test_submit_valid_form_creates() {
    let (store, app) = setup_app();

    let response = app
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "created");
    let id: RecordId = body["id"].as_str().unwrap().parse().unwrap();

    let saved = store.read_one(id).await.unwrap();
    assert_eq!(saved.full_name, "Fernanda Muñoz");
}

#[tokio::test]
async fn test_submit_invalid_form_lists_every_bad_field() {
    let (store, app) = setup_app();

    let form = json!({
        "national_id": "12345678-0",
        "full_name": "",
        "email": "a@b",
        "phone": "555",
        "position": ""
    });
    let response = app
        .oneshot(json_request("POST", "/api/form/submit", form))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(
        body["invalid_fields"],
        json!(["national_id", "full_name", "email", "position"])
    );
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_then_submit_updates_and_resets_form() {
    let (store, app) = setup_app();
    let id = store.create(&stored("Antes")).await.unwrap();

    let response = app
        .clone()
        .oneshot(test_request("POST", &format!("/api/form/edit/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["full_name"], "Antes");
    assert_eq!(body["national_id"], "6-k");

    let response = app.clone().oneshot(test_request("GET", "/api/form")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({"mode": "edit", "id": id.to_string()}));

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["outcome"], "updated");
    assert_eq!(body["id"], id.to_string());

    assert_eq!(store.read_one(id).await.unwrap().full_name, "Fernanda Muñoz");
    assert_eq!(store.list_all().await.unwrap().len(), 1);

    let response = app.oneshot(test_request("GET", "/api/form")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body, json!({"mode": "create"}));
}

#[tokio::test]
async fn test_clear_abandons_edit() {
    let (store, app) = setup_app();
    let id = store.create(&stored("Existente")).await.unwrap();

    app.clone()
        .oneshot(test_request("POST", &format!("/api/form/edit/{}", id)))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(test_request("POST", "/api/form/clear"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await, json!({"mode": "create"}));

    let response = app
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(store.list_all().await.unwrap().len(), 2);
    assert_eq!(store.read_one(id).await.unwrap().full_name, "Existente");
}

#[tokio::test]
async fn test_edit_unknown_record_is_404() {
    let (_store, app) = setup_app();

    let uri = format!("/api/form/edit/{}", RecordId::generate());
    let response = app.clone().oneshot(test_request("POST", &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let response = app.oneshot(test_request("GET", "/api/form")).await.unwrap();
    assert_eq!(extract_json(response.into_body()).await, json!({"mode": "create"}));
}

#[tokio::test]
async fn test_edit_malformed_id_is_400() {
    let (_store, app) = setup_app();

    let response = app
        .oneshot(test_request("POST", "/api/form/edit/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_for_vanished_record_is_404_and_keeps_edit() {
    let (store, app) = setup_app();
    let id = store.create(&stored("Efímero")).await.unwrap();

    app.clone()
        .oneshot(test_request("POST", &format!("/api/form/edit/{}", id)))
        .await
        .unwrap();
    store.delete(id).await.unwrap();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(test_request("GET", "/api/form")).await.unwrap();
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({"mode": "edit", "id": id.to_string()})
    );
}

// =============================================================================
// Candidates
// =============================================================================

#[tokio::test]
async fn test_delete_candidate() {
    let (store, app) = setup_app();
    let keep = store.create(&stored("Queda")).await.unwrap();
    let gone = store.create(&stored("Sale")).await.unwrap();

    let response = app
        .oneshot(test_request("DELETE", &format!("/api/candidates/{}", gone)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let ids: Vec<RecordId> = store.list_all().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![keep]);
}

#[tokio::test]
async fn test_delete_malformed_id_is_400() {
    let (_store, app) = setup_app();

    let response = app
        .oneshot(test_request("DELETE", "/api/candidates/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("not-a-uuid"));
}

// =============================================================================
// Store Failures and Malformed Requests
// =============================================================================

#[tokio::test]
async fn test_submit_create_store_failure_is_502() {
    let (store, app) = setup_flaky_app();
    store.set_failing(true);

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].as_str().unwrap().contains("connection reset"));

    let response = app.oneshot(test_request("GET", "/api/form")).await.unwrap();
    assert_eq!(extract_json(response.into_body()).await, json!({"mode": "create"}));
}

#[tokio::test]
async fn test_submit_update_store_failure_is_502_and_keeps_edit() {
    let (store, app) = setup_flaky_app();
    let id = store.create(&stored("Intacto")).await.unwrap();

    let response = app
        .clone()
        .oneshot(test_request("POST", &format!("/api/form/edit/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    store.set_failing(true);
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/form/submit", valid_form()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(extract_json(response.into_body()).await["error"].is_string());

    let response = app.oneshot(test_request("GET", "/api/form")).await.unwrap();
    assert_eq!(
        extract_json(response.into_body()).await,
        json!({"mode": "edit", "id": id.to_string()})
    );

    store.set_failing(false);
    assert_eq!(store.read_one(id).await.unwrap().full_name, "Intacto");
}

#[tokio::test]
async fn test_delete_store_failure_is_502() {
    let (store, app) = setup_flaky_app();
    let id = store.create(&stored("Protegido")).await.unwrap();
    store.set_failing(true);

    let response = app
        .oneshot(test_request("DELETE", &format!("/api/candidates/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(extract_json(response.into_body()).await["error"].is_string());

    store.set_failing(false);
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_mistyped_body_is_400_json() {
    let (store, app) = setup_app();

    let form = json!({
        "national_id": 12345678,
        "full_name": "Fernanda Muñoz",
        "email": "fmunoz@example.cl",
        "phone": "555",
        "position": "QA"
    });
    let response = app
        .oneshot(json_request("POST", "/api/form/submit", form))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert!(body.get("outcome").is_none());
    assert!(body["error"].as_str().unwrap().contains("national_id"));
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_without_json_content_type_is_400() {
    let (_store, app) = setup_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/form/submit")
        .body(Body::from(valid_form().to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(extract_json(response.into_body()).await["error"].is_string());
}

#[tokio::test]
async fn test_event_stream_sends_current_snapshot() {
    let (store, app) = setup_app();
    store.create(&stored("Visible")).await.unwrap();

    let response = app.oneshot(test_request("GET", "/api/events")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/event-stream"
    );

    let mut body = response.into_body();
    let frame = tokio::time::timeout(Duration::from_secs(2), body.frame())
        .await
        .expect("snapshot should arrive promptly")
        .expect("stream should not end")
        .expect("frame should be readable");
    let data = frame.into_data().expect("data frame");
    let text = String::from_utf8(data.to_vec()).unwrap();

    assert!(text.starts_with("event: CandidatesSnapshot\n"), "got: {}", text);
    let payload = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .expect("data line");
    let records: Value = serde_json::from_str(payload).unwrap();
    assert_eq!(records.as_array().unwrap().len(), 1);
    assert_eq!(records[0]["full_name"], "Visible");
}
