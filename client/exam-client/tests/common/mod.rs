#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use exam_client::{config::Config, services::AppState};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const ACCESS_CODE: &str = "1234";

/// How the fake backend answers.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub questions: Value,
    pub fetch_status: Option<u16>,
    pub submit_status: Option<u16>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            questions: two_questions(),
            fetch_status: None,
            submit_status: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordedUpload {
    pub fields: HashMap<String, String>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub file_bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Recorder {
    pub verify_requests: Vec<Value>,
    pub question_queries: Vec<HashMap<String, String>>,
    pub uploads: Vec<RecordedUpload>,
}

#[derive(Clone)]
struct BackendState {
    behavior: Arc<Behavior>,
    recorder: Arc<Mutex<Recorder>>,
}

pub struct FakeBackend {
    pub base_url: String,
    pub recorder: Arc<Mutex<Recorder>>,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.recorder.lock().unwrap().uploads.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn two_questions() -> Value {
    json!([
        {"id": 1, "question": "2 + 2 = ?", "options": ["3", "4", "5"], "answer": "4"},
        {"id": "q-2", "question": "O'zbekiston poytaxti?", "options": ["Samarqand", "Toshkent"], "answer": "Toshkent"}
    ])
}

pub async fn spawn_backend(behavior: Behavior) -> FakeBackend {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let recorder = Arc::new(Mutex::new(Recorder::default()));
    let state = BackendState {
        behavior: Arc::new(behavior),
        recorder: recorder.clone(),
    };

    let app = Router::new()
        .route("/verify", post(verify))
        .route("/tests", get(questions))
        .route("/submit", post(submit))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend {
        base_url: format!("http://{addr}"),
        recorder,
        handle,
    }
}

/// Address nothing listens on, for transport failures.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn test_config(base_url: &str) -> Config {
    Config {
        api_base_url: base_url.to_string(),
        request_timeout_secs: 5,
        focus_reporting: false,
    }
}

pub fn test_state(base_url: &str) -> AppState {
    AppState::new(test_config(base_url)).expect("Failed to initialize test app state")
}

async fn verify(State(state): State<BackendState>, Json(body): Json<Value>) -> Json<Value> {
    let granted = body["code"] == ACCESS_CODE;
    state.recorder.lock().unwrap().verify_requests.push(body);

    if granted {
        Json(json!({"access": true}))
    } else {
        Json(json!({"access": false, "message": "Kod noto'g'ri"}))
    }
}

async fn questions(
    State(state): State<BackendState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    state.recorder.lock().unwrap().question_queries.push(query);

    match state.behavior.fetch_status {
        Some(status) => Err(StatusCode::from_u16(status).unwrap()),
        None => Ok(Json(state.behavior.questions.clone())),
    }
}

async fn submit(State(state): State<BackendState>, mut multipart: Multipart) -> (StatusCode, String) {
    let mut upload = RecordedUpload::default();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            upload.file_name = field.file_name().map(str::to_string);
            upload.content_type = field.content_type().map(str::to_string);
            upload.file_bytes = field.bytes().await.unwrap().to_vec();
        } else {
            upload.fields.insert(name, field.text().await.unwrap());
        }
    }
    state.recorder.lock().unwrap().uploads.push(upload);

    match state.behavior.submit_status {
        Some(status) => (
            StatusCode::from_u16(status).unwrap(),
            "storage unavailable".to_string(),
        ),
        None => (StatusCode::OK, String::new()),
    }
}
