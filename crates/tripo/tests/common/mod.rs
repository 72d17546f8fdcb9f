//! In-process fake of the Tripo OpenAPI.
//!
//! Binds an axum router on a random local port. Every request is
//! counted and its `Authorization` header recorded; uploads and task
//! bodies are kept for assertions. Task status replies come from a
//! script whose last entry repeats.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use meshgen_core::Credentials;
use meshgen_tripo::{JobClient, TripoApi};
use serde_json::{json, Value};

pub const TEST_TOKEN: &str = "tsk_integration_token_1234";

/// Bytes served as the finished model.
pub const MODEL_BYTES: &[u8] = b"glTF\x02\x00\x00\x00fake binary model payload";

/// One scripted reply to `GET /task/{id}`.
#[derive(Debug, Clone)]
pub enum StatusReply {
    Json(Value),
    /// Served verbatim with a 200 status.
    Raw(&'static str),
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
pub struct FakeState {
    pub requests: AtomicUsize,
    pub auth_headers: Mutex<Vec<Option<String>>>,
    pub uploads: Mutex<Vec<Upload>>,
    pub tasks: Mutex<Vec<(Option<String>, Value)>>,
    pub statuses: Mutex<VecDeque<StatusReply>>,
    pub task_id: Mutex<String>,
    pub reject_tasks: Mutex<bool>,
    /// Answer task creation with HTTP 200 and a non-zero envelope code.
    pub refuse_tasks: Mutex<bool>,
}

pub struct FakeTripo {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
}

impl FakeTripo {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        *state.task_id.lock().unwrap() = "job-123".to_string();

        let app = Router::new()
            .route("/upload", post(upload))
            .route("/task", post(create_task))
            .route("/task/{task_id}", get(get_task))
            .route("/user/balance", get(balance))
            .route("/files/out.glb", get(model_file))
            .route("/files/truncated.glb", get(truncated_file))
            .layer(middleware::from_fn_with_state(state.clone(), record))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn client(&self) -> JobClient {
        let api = TripoApi::with_client(
            reqwest::Client::new(),
            self.base_url(),
            Credentials::new(TEST_TOKEN).unwrap(),
        );
        JobClient::with_api(api)
    }

    /// Replace the status script.
    pub fn script(&self, replies: impl IntoIterator<Item = StatusReply>) {
        *self.state.statuses.lock().unwrap() = replies.into_iter().collect();
    }

    pub fn reject_tasks(&self) {
        *self.state.reject_tasks.lock().unwrap() = true;
    }

    pub fn refuse_tasks(&self) {
        *self.state.refuse_tasks.lock().unwrap() = true;
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn tasks(&self) -> Vec<(Option<String>, Value)> {
        self.state.tasks.lock().unwrap().clone()
    }

    pub fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.auth_headers.lock().unwrap().clone()
    }
}

pub fn status(task_id: &str, status: &str) -> StatusReply {
    StatusReply::Json(json!({"task_id": task_id, "status": status, "progress": 0}))
}

pub fn running(task_id: &str, progress: u8) -> StatusReply {
    StatusReply::Json(json!({"task_id": task_id, "status": "running", "progress": progress}))
}

pub fn success(task_id: &str, model_url: &str) -> StatusReply {
    StatusReply::Json(json!({
        "task_id": task_id,
        "status": "success",
        "progress": 100,
        "output": {"model": model_url}
    }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn record(State(state): State<Arc<FakeState>>, request: Request, next: Next) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    let auth = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.auth_headers.lock().unwrap().push(auth);
    next.run(request).await
}

fn ok(data: Value) -> Json<Value> {
    Json(json!({"code": 0, "data": data}))
}

async fn upload(State(state): State<Arc<FakeState>>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.unwrap_or_default().to_vec();

        let mut uploads = state.uploads.lock().unwrap();
        uploads.push(Upload {
            file_name,
            content_type,
            bytes,
        });
        let token = format!("img-{}", uploads.len());
        return ok(json!({"image_token": token})).into_response();
    }

    (StatusCode::BAD_REQUEST, "missing file part").into_response()
}

async fn create_task(
    State(state): State<Arc<FakeState>>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if *state.reject_tasks.lock().unwrap() {
        return (StatusCode::BAD_REQUEST, r#"{"code":2002,"message":"bad prompt"}"#).into_response();
    }
    if *state.refuse_tasks.lock().unwrap() {
        return Json(json!({"code": 2010, "message": "insufficient credit"})).into_response();
    }

    state
        .tasks
        .lock()
        .unwrap()
        .push((query.get("format").cloned(), body));
    let task_id = state.task_id.lock().unwrap().clone();
    ok(json!({"task_id": task_id})).into_response()
}

async fn get_task(State(state): State<Arc<FakeState>>, Path(task_id): Path<String>) -> Response {
    let reply = {
        let mut statuses = state.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        }
    };

    match reply {
        Some(StatusReply::Json(data)) => ok(data).into_response(),
        Some(StatusReply::Raw(body)) => body.into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"code": 2001, "message": format!("task {task_id} not found")})),
        )
            .into_response(),
    }
}

async fn balance() -> Json<Value> {
    ok(json!({"balance": 1250.5, "frozen": 40.0}))
}

async fn model_file() -> Response {
    (
        [(header::CONTENT_TYPE, "model/gltf-binary")],
        Bytes::from_static(MODEL_BYTES),
    )
        .into_response()
}

/// Announces the full length, sends half and then drops the connection.
async fn truncated_file() -> Response {
    let half = Bytes::from_static(&MODEL_BYTES[..MODEL_BYTES.len() / 2]);
    let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
        Ok(half),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "dropped")),
    ];

    Response::builder()
        .header(header::CONTENT_LENGTH, MODEL_BYTES.len())
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap()
}
