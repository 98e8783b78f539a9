// Router harness shared by the handler tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;

use crate::config::Config;
use crate::db::memory::MemoryTaskRepository;
use crate::db::TaskRepository;
use crate::models::AppState;
use crate::storage::memory::StoredObject;
use crate::storage::{MemoryBackend, ObjectBackend, StorageClient, StorageError};

const BOUNDARY: &str = "taskdeck-test-boundary";

/// Memory backend that counts calls and can simulate an outage.
pub struct RecordingBackend {
    inner: MemoryBackend,
    fail: bool,
    calls: AtomicUsize,
}

impl RecordingBackend {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.inner.object(key).await
    }

    pub async fn keys(&self) -> Vec<String> {
        self.inner.keys().await
    }

    fn record(&self) -> Result<(), StorageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::Config("simulated storage outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectBackend for RecordingBackend {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.record()?;
        self.inner.put(key, data, content_type).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.record()?;
        self.inner.remove(key).await
    }

    async fn presign_get(&self, key: &str, expiration_secs: u32) -> Result<String, StorageError> {
        self.record()?;
        self.inner.presign_get(key, expiration_secs).await
    }
}

pub struct TestApp {
    pub app: Router,
    pub tasks: Arc<MemoryTaskRepository>,
    pub backend: Arc<RecordingBackend>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn with_failing_backend() -> Self {
        Self::build(true)
    }

    fn build(fail: bool) -> Self {
        let config = Config::from_lookup(|key| {
            match key {
                "DATABASE_URL" => Some("postgres://localhost/unused"),
                "STORAGE_PROVIDER" => Some("memory"),
                "S3_BUCKET" => Some("task-images"),
                _ => None,
            }
            .map(str::to_string)
        })
        .expect("test config");

        let tasks = Arc::new(MemoryTaskRepository::new());
        let backend = Arc::new(RecordingBackend {
            inner: MemoryBackend::new(&config.storage.s3_bucket),
            fail,
            calls: AtomicUsize::new(0),
        });
        let storage = StorageClient::new(backend.clone(), config.storage.allowed_extensions.clone());

        let state = AppState {
            tasks: tasks.clone(),
            storage,
            config,
        };

        Self {
            app: super::create_router(state),
            tasks,
            backend,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn create_task(&self, title: &str) -> i64 {
        let (status, body) = self
            .send(json_request("POST", "/api/tasks", serde_json::json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_i64().unwrap()
    }

    /// Points a task at `key` without going through the upload endpoint.
    pub async fn attach_image(&self, id: i64, key: &str) {
        let id = i32::try_from(id).unwrap();
        self.tasks.set_image(id, key).await.unwrap().unwrap();
    }

    pub async fn image_of(&self, id: i64) -> Option<String> {
        let id = i32::try_from(id).unwrap();
        self.tasks.get(id).await.unwrap().unwrap().image_filename
    }
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    raw_json_request(method, uri, &body.to_string())
}

pub fn raw_json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: Option<&str>,
    content_type: Option<&str>,
    data: Bytes,
) -> Request<Body> {
    let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", field);
    if let Some(filename) = filename {
        disposition.push_str(&format!("; filename=\"{}\"", filename));
    }

    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n{}\r\n", BOUNDARY, disposition).as_bytes());
    if let Some(content_type) = content_type {
        body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(&data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}
