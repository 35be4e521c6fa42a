//! Server test utilities.

use super::fixtures::{BOUNDARY, Part, multipart_body};
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use sitehost_core::config::{AppConfig, MetadataConfig};
use sitehost_metadata::SiteStore;
use sitehost_server::{AppState, create_router};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server backed by a SQLite file in a temp directory.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.metadata = MetadataConfig::Sqlite {
            path: temp_dir.path().join("sites.db"),
            busy_timeout_secs: 30,
            max_connections: 4,
        };
        modifier(&mut config);

        let store = sitehost_metadata::from_config(&config.metadata)
            .await
            .expect("Failed to create site store");

        let state = AppState::new(config, store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Create a test server on top of an existing store.
    pub fn with_store(store: Arc<dyn SiteStore>) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let state = AppState::new(AppConfig::for_testing(), store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Get access to the underlying store.
    pub fn store(&self) -> Arc<dyn SiteStore> {
        self.state.store.clone()
    }

    /// Send a request through the router.
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// POST a multipart form to /upload and return status and body text.
    pub async fn upload_parts(&self, parts: &[Part<'_>]) -> (StatusCode, String) {
        let request = Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, body_text(response).await)
    }

    /// Upload `archive` as `site.tar.gz` for `hostname`.
    pub async fn upload(&self, hostname: &str, archive: &[u8]) -> (StatusCode, String) {
        self.upload_parts(&[Part::file(hostname, "site.tar.gz", archive)])
            .await
    }

    /// GET `path` with the given Host header.
    pub async fn get(&self, host: &str, path: &str) -> Response {
        self.request("GET", host, path, &[]).await
    }

    /// Issue `method` on `path` with the given Host and extra headers.
    pub async fn request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, host);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }
}

/// Collect a response body.
#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

/// Collect a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    String::from_utf8_lossy(&body_bytes(response).await).into_owned()
}

/// Collect a JSON error body.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap_or(serde_json::Value::Null)
}

/// Header value as a string, if present.
#[allow(dead_code)]
pub fn header_str<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
