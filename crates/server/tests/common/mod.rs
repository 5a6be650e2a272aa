//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with the real SQLite stores and mock file host, payment processor and
//! notifier injected, so requests can be driven end to end without external
//! infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mediastore_core::{
    testing::{MockNotifier, MockPaymentClient, MockRemoteFiles},
    ApiKeyAuthenticator, AuthMethod, Authenticator, OpenAccess, SqliteCatalogStore,
    SqliteSalesStore,
};
use mediastore_server::state::{AppState, Backends};

/// Re-export fixtures for test convenience
pub use mediastore_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - The remote file host (MockRemoteFiles)
/// - The payment processor (MockPaymentClient)
/// - Outgoing notifications (MockNotifier)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_sync() {
///     let fixture = TestFixture::new().await;
///     fixture.add_recording(&recent_recording(1)).await;
///
///     let response = fixture.post("/api/v1/sync", json!({})).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock file host - configure listings and inspect shares
    pub remote: Arc<MockRemoteFiles>,
    /// Mock payment processor - mark sessions paid
    pub payments: Arc<MockPaymentClient>,
    /// Mock notifier - inspect sent notifications
    pub notifier: Arc<MockNotifier>,
    /// Temporary directory for test database and thumbnails
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Configuration for test fixture.
#[derive(Debug, Clone, Default)]
pub struct TestConfig {
    /// Require this API key on admin routes
    pub api_key: Option<String>,
}

impl TestConfig {
    pub fn with_api_key(key: &str) -> Self {
        Self {
            api_key: Some(key.to_string()),
        }
    }
}

impl TestFixture {
    /// Create a new test fixture with default mocks and no auth.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let thumbnail_dir = temp_dir.path().join("thumbs");
        std::fs::create_dir_all(&thumbnail_dir).expect("Failed to create thumbnail dir");

        let mut config = fixtures::config();
        config.database.path = db_path.clone();
        config.store.thumbnail_dir = thumbnail_dir;

        let authenticator: Arc<dyn Authenticator> = match test_config.api_key {
            Some(key) => {
                config.auth.method = AuthMethod::ApiKey;
                config.auth.api_key = Some(key.clone());
                Arc::new(ApiKeyAuthenticator::new(key))
            }
            None => Arc::new(OpenAccess),
        };

        let remote = Arc::new(MockRemoteFiles::new());
        let payments = Arc::new(MockPaymentClient::new());
        let notifier = Arc::new(MockNotifier::new());

        let catalog = Arc::new(
            SqliteCatalogStore::new(&db_path).expect("Failed to create catalog store"),
        );
        let sales =
            Arc::new(SqliteSalesStore::new(&db_path).expect("Failed to create sales store"));

        let state = Arc::new(AppState::new(
            config,
            authenticator,
            Backends {
                catalog,
                sales,
                remote: remote.clone(),
                payments: payments.clone(),
                notifier: notifier.clone(),
            },
        ));

        let router = mediastore_server::api::create_router(state);

        Self {
            router,
            remote,
            payments,
            notifier,
            temp_dir,
        }
    }

    /// List a recording on the mock file host.
    pub async fn add_recording(&self, path: &str) {
        self.remote.add_file(fixtures::remote_file(path)).await;
    }

    /// Run a sync pass through the API and return its report.
    pub async fn sync(&self) -> Value {
        let response = self.post("/api/v1/sync", Value::Null).await;
        assert_eq!(response.status, StatusCode::OK, "sync failed: {}", response.body);
        response.body
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None, &[]).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    /// Send a GET request with extra headers.
    pub async fn get_with_headers(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, None, headers).await
    }

    /// Send a POST request with JSON body and extra headers.
    pub async fn post_with_headers(
        &self,
        path: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        self.request("POST", path, Some(body), headers).await
    }

    /// Send a GET request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

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

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            request_builder = request_builder.header(*name, *value);
        }

        let body = match body {
            Some(Value::Null) | None => Body::empty(),
            Some(json_body) => {
                request_builder = request_builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&json_body).unwrap())
            }
        };

        let request = request_builder.body(body).unwrap();

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
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Path of a recording made `days_ago` days before today, 20:00 to 21:30.
///
/// Recent dates keep the file inside the retention window.
pub fn recent_recording(days_ago: i64) -> String {
    let date = Utc::now().date_naive() - Duration::days(days_ago);
    format!(
        "/{}/{}_20-00_21-30.mp4",
        date.format("%Y/%m"),
        date.format("%Y-%m-%d")
    )
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

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
