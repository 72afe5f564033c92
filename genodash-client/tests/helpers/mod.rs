//! In-process mock backend for integration tests
//!
//! Serves the dashboard API surface on an ephemeral port with scripted
//! responses and per-endpoint request counters, so tests can assert not
//! just on outcomes but on exactly how many requests were issued.

#![allow(dead_code)]

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use genodash_client::session::SessionStore;
use genodash_common::config::ClientConfig;
use genodash_common::models::{Role, User};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted and counted backend state
pub struct MockBackend {
    pub sign_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,

    /// Override for GET /api/users/me (status, body)
    pub me_response: Mutex<Option<(u16, Value)>>,
    /// Override for POST /api/consents/sign (status, body)
    pub sign_response: Mutex<Option<(u16, Value)>>,
    /// Override for POST /api/genome/upload
    pub upload_response: Mutex<Option<(u16, Value)>>,
    /// Records returned by GET /api/consents
    pub consents: Mutex<Vec<Value>>,
    /// Responses for GET /api/analysis/{id}, consumed front to back.
    /// The final entry is sticky; an empty script means 404.
    pub analysis_script: Mutex<VecDeque<(u16, Value)>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sign_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            me_response: Mutex::new(None),
            sign_response: Mutex::new(None),
            upload_response: Mutex::new(None),
            consents: Mutex::new(Vec::new()),
            analysis_script: Mutex::new(VecDeque::new()),
        })
    }

    pub fn script_analysis(&self, steps: Vec<(u16, Value)>) {
        *self.analysis_script.lock().unwrap() = steps.into();
    }

    /// Convenience: a job snapshot body in the backend's envelope
    pub fn running(progress: f64) -> (u16, Value) {
        (
            200,
            json!({ "analysis": {
                "analysisId": "j-1",
                "fileId": "f-1",
                "status": "Running",
                "progress": progress,
            }}),
        )
    }

    pub fn queued() -> (u16, Value) {
        (
            200,
            json!({ "analysis": {
                "analysisId": "j-1",
                "fileId": "f-1",
                "status": "Queued",
                "progress": 0,
            }}),
        )
    }

    pub fn completed(summary: &str) -> (u16, Value) {
        (
            200,
            json!({ "analysis": {
                "analysisId": "j-1",
                "fileId": "f-1",
                "status": "Completed",
                "progress": 100,
                "results": {
                    "metrics": { "gc_percent": 41.2, "length": 16569 },
                    "summary": summary,
                }
            }}),
        )
    }
}

/// Bind the mock on an ephemeral port; returns its base URL
pub async fn spawn(state: Arc<MockBackend>) -> String {
    let app = Router::new()
        .route("/api/users/me", get(me))
        .route("/api/consents/sign", post(sign_consent))
        .route("/api/consents", get(list_consents))
        .route("/api/genome/upload", post(upload))
        .route("/api/genome/my-files", get(my_files))
        .route("/api/analysis/sequence/:file_id", post(submit_sequence))
        .route("/api/analysis/:id", get(analysis_status))
        .route("/api/variants/detect/:file_id", get(detect_variants))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });
    format!("http://{addr}")
}

async fn me(State(state): State<Arc<MockBackend>>) -> (StatusCode, Json<Value>) {
    if let Some((status, body)) = state.me_response.lock().unwrap().clone() {
        return (StatusCode::from_u16(status).unwrap(), Json(body));
    }
    (
        StatusCode::OK,
        Json(json!({
            "user": {
                "_id": "u-1",
                "name": "Pat",
                "role": "User",
            }
        })),
    )
}

async fn sign_consent(State(state): State<Arc<MockBackend>>) -> (StatusCode, Json<Value>) {
    state.sign_calls.fetch_add(1, Ordering::SeqCst);
    if let Some((status, body)) = state.sign_response.lock().unwrap().clone() {
        return (StatusCode::from_u16(status).unwrap(), Json(body));
    }
    (
        StatusCode::OK,
        Json(json!({
            "message": "Consent signed successfully",
            "consentId": "mongo-object-id",
            "consent": {
                "consentId": "c-1",
                "userId": "u-1",
                "signed": true,
                "signedAt": "2025-01-01T00:00:00Z",
            }
        })),
    )
}

async fn list_consents(State(state): State<Arc<MockBackend>>) -> Json<Value> {
    Json(Value::Array(state.consents.lock().unwrap().clone()))
}

async fn upload(
    State(state): State<Arc<MockBackend>>,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    state.upload_calls.fetch_add(1, Ordering::SeqCst);
    if let Some((status, body)) = state.upload_response.lock().unwrap().clone() {
        return (StatusCode::from_u16(status).unwrap(), Json(body));
    }

    let mut filename = String::new();
    let mut consent_id = String::new();
    let mut size = 0usize;
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "genomeFile" => {
                filename = field.file_name().unwrap_or_default().to_string();
                size = field.bytes().await.map(|b| b.len()).unwrap_or(0);
            }
            "consentId" => {
                consent_id = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    if consent_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "consentId is required" })),
        );
    }

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded",
            "fileId": "f-1",
            "filename": filename,
            "fileType": "vcf",
            "size": size,
        })),
    )
}

async fn my_files(State(_state): State<Arc<MockBackend>>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "files": [
                { "fileId": "f-1", "filename": "sample.vcf", "fileType": "vcf", "size": 128 }
            ],
            "total": 1,
        }
    }))
}

async fn submit_sequence(
    State(state): State<Arc<MockBackend>>,
    Path(_file_id): Path<String>,
) -> Json<Value> {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "analysisId": "j-1" }))
}

async fn analysis_status(
    State(state): State<Arc<MockBackend>>,
    Path(_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    let mut script = state.analysis_script.lock().unwrap();
    let step = if script.len() > 1 {
        script.pop_front()
    } else {
        script.front().cloned()
    };
    match step {
        Some((status, body)) => (StatusCode::from_u16(status).unwrap(), Json(body)),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Analysis not found" })),
        ),
    }
}

async fn detect_variants(
    State(state): State<Arc<MockBackend>>,
    Path(file_id): Path<String>,
) -> Json<Value> {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "message": "Variant analysis started",
        "analysis": {
            "analysisId": "v-1",
            "fileId": file_id,
            "analysisType": "VariantDetection",
            "status": "Running",
            "progress": 0,
        }
    }))
}

/// Client config pointed at the mock, with fast polling for tests
pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api_base_url = base_url.to_string();
    config.poll_interval = Duration::from_millis(25);
    config
}

/// Logged-in Patient session, in memory only
pub fn patient_session() -> Arc<SessionStore> {
    let session = Arc::new(SessionStore::in_memory());
    session
        .login(
            "test-token".to_string(),
            User {
                id: "u-1".to_string(),
                name: "Pat".to_string(),
                role: Role::Patient,
                consent_id: None,
            },
        )
        .unwrap();
    session
}

/// Poll an assertion until it holds or the deadline passes
pub async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}
