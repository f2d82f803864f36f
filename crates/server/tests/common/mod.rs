//! Common test utilities for HTTP testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock acquisition system and a temporary SQLite database, so the
//! download signals can be exercised without a real Lidarr.

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use albumwatch_core::{
    config::{DatabaseConfig, ServerConfig},
    testing::MockAcquisitionClient,
    Config, DownloadOrchestrator, OrchestratorConfig, SqliteJobStore, SqliteSyncQueue,
    UnavailableAlbum,
};
use albumwatch_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use albumwatch_core::testing::fixtures;

/// Test fixture for HTTP testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_add() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/downloads", json!({
///         "download_id": "dl-1",
///         "album_title": "Mezzanine",
///         "album_ref": "mb-mezzanine",
///         "artist_name": "Massive Attack"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
#[allow(dead_code)]
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock acquisition system - configure queue and albums
    pub acquisition: Arc<MockAcquisitionClient>,
    /// Job store backing the orchestrator
    pub jobs: Arc<SqliteJobStore>,
    /// Sync queue backing the orchestrator
    pub sync_queue: Arc<SqliteSyncQueue>,
    /// The orchestrator, if enabled
    pub orchestrator: Option<DownloadOrchestrator>,
    /// Albums reported unavailable
    pub notified: Arc<Mutex<Vec<UnavailableAlbum>>>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with the orchestrator enabled.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let acquisition = Arc::new(MockAcquisitionClient::new());
        let jobs = Arc::new(SqliteJobStore::new(&db_path).expect("Failed to create job store"));
        let sync_queue =
            Arc::new(SqliteSyncQueue::new(&db_path).expect("Failed to create sync queue"));

        let orchestrator_config = OrchestratorConfig {
            enabled: !test_config.disable_orchestrator,
            max_attempts: test_config.max_attempts.unwrap_or(3),
            ..Default::default()
        };

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            acquisition: None,
            orchestrator: orchestrator_config.clone(),
        };

        let notified = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = if orchestrator_config.enabled {
            let orch = DownloadOrchestrator::new(
                orchestrator_config,
                acquisition.clone(),
                jobs.clone(),
                sync_queue.clone(),
            );
            let sink = Arc::clone(&notified);
            orch.on_unavailable_album(move |album| {
                sink.lock().unwrap().push(album.clone());
                Ok(())
            })
            .await;
            Some(orch)
        } else {
            None
        };

        let state = Arc::new(AppState::new(config, orchestrator.clone()));
        let router = create_router(state);

        Self {
            router,
            acquisition,
            jobs,
            sync_queue,
            orchestrator,
            notified,
            temp_dir,
        }
    }

    /// Albums reported unavailable so far.
    pub fn notified(&self) -> Vec<UnavailableAlbum> {
        self.notified.lock().unwrap().clone()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body_bytes).into()))
        };

        TestResponse { status, body }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Run without an orchestrator (signals answer 503)
    pub disable_orchestrator: bool,
    /// Override the attempt budget
    pub max_attempts: Option<u32>,
}

#[allow(dead_code)]
impl TestConfig {
    /// Create config with the orchestrator disabled.
    pub fn without_orchestrator() -> Self {
        Self {
            disable_orchestrator: true,
            ..Default::default()
        }
    }

    /// Create config with a custom attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            ..Default::default()
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
