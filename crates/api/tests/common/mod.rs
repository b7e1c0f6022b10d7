#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::value::RawValue;
use serde_json::Value;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use toonify_api::config::ServerConfig;
use toonify_api::router::build_app_router;
use toonify_api::state::AppState;
use toonify_comic::{ComicApiError, ComicGenerator, RetryPolicy};
use toonify_store::{InMemoryJobStore, JobStore};

/// Build a test `ServerConfig` with safe defaults.
///
/// The upstream deadline is generous; tests that exercise it override
/// `upstream_timeout` themselves.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        comic_api_url: "http://127.0.0.1:9/unused".to_string(),
        upstream_timeout: Duration::from_secs(5),
        job_retention: Duration::from_secs(600),
        sweep_interval: None,
        retry: RetryPolicy::default(),
    }
}

type Respond = Box<dyn Fn(&Value) -> Result<Value, ComicApiError> + Send + Sync>;

/// A fake comic service whose calls block until the test releases them.
pub struct GatedGenerator {
    gate: Semaphore,
    respond: Respond,
}

impl GatedGenerator {
    /// Calls wait for [`GatedGenerator::release`].
    pub fn closed(
        respond: impl Fn(&Value) -> Result<Value, ComicApiError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(0),
            respond: Box::new(respond),
        })
    }

    /// Calls return immediately.
    pub fn open(
        respond: impl Fn(&Value) -> Result<Value, ComicApiError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
            respond: Box::new(respond),
        })
    }

    /// Let `n` more calls through.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl ComicGenerator for GatedGenerator {
    async fn generate(&self, payload: &RawValue) -> Result<Box<RawValue>, ComicApiError> {
        self.gate
            .acquire()
            .await
            .expect("gate semaphore closed")
            .forget();
        let payload: Value = serde_json::from_str(payload.get()).expect("payload is JSON");
        let result = (self.respond)(&payload)?;
        Ok(serde_json::value::to_raw_value(&result).expect("result serializes"))
    }
}

/// Serve `upstream` on an ephemeral port and return its base URL.
pub async fn spawn_upstream(upstream: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    format!("http://{addr}")
}

/// Build the full application router with the given store and generator.
pub fn build_test_app(store: Arc<dyn JobStore>, generator: Arc<dyn ComicGenerator>) -> Router {
    build_test_app_with(test_config(), store, generator)
}

pub fn build_test_app_with(
    config: ServerConfig,
    store: Arc<dyn JobStore>,
    generator: Arc<dyn ComicGenerator>,
) -> Router {
    let state = AppState::new(config.clone(), store, generator);
    build_app_router(state, &config)
}

/// Router plus a fresh in-memory store on the system clock.
pub fn app_with(generator: Arc<dyn ComicGenerator>) -> (Router, Arc<dyn JobStore>) {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    (build_test_app(Arc::clone(&store), generator), store)
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Submit `payload` and return the job id, asserting a 202.
pub async fn submit(app: &Router, payload: &Value) -> String {
    let response = post_json(app.clone(), "/submit", payload).await;
    assert_eq!(response.status(), axum::http::StatusCode::ACCEPTED);
    let json = body_json(response).await;
    json["jobId"].as_str().expect("jobId should be a string").to_string()
}

/// Poll `/status` until the job leaves `pending`, returning the last body.
pub async fn poll_until_terminal(app: &Router, job_id: &str) -> Value {
    for _ in 0..500 {
        let response = get(app.clone(), &format!("/status?jobId={job_id}")).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        let json = body_json(response).await;
        if json["status"] != "pending" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {job_id} never left pending");
}
