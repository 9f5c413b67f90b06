//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that wires the router to SQLite
//! stores in a temporary directory, the same way the binary does.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use custodian_core::{
    create_event_system, load_config_from_str, EventStore, LifecycleStores, SqliteEventStore,
};
use custodian_server::api::create_router;
use custodian_server::state::{build_lifecycle, AppState};

/// Access section granting each fixture role what it needs.
const ROLE_TABLE: &str = r#"
[access]
method = "role_table"

[[access.grants]]
role = "admin"
resources = ["asset", "ticket", "repair", "issuance"]
actions = ["create", "update", "delete"]

[[access.grants]]
role = "technician"
resources = ["asset", "ticket", "repair"]
actions = ["create", "update"]

[[access.grants]]
role = "clerk"
resources = ["issuance"]
actions = ["create", "update"]

[[access.grants]]
role = "staff"
resources = ["ticket"]
actions = ["create"]
"#;

const ALLOW_ALL: &str = r#"
[access]
method = "allow_all"
"#;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_register() {
///     let fixture = TestFixture::new().await;
///
///     let response = fixture.post("/api/v1/assets", json!({
///         "name": "ThinkPad", "barcode": "LT-0001",
///         "category_id": "laptops", "department_id": "it"
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub event_store: Arc<dyn EventStore>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
    /// Identity sent by `get`/`post`
    pub actor: (String, String),
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Permissive access control, acting as an admin.
    pub async fn new() -> Self {
        Self::with_access(ALLOW_ALL).await
    }

    /// Role-table access control, acting as an admin.
    pub async fn with_role_table() -> Self {
        Self::with_access(ROLE_TABLE).await
    }

    async fn with_access(access_toml: &str) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("custodian.db");

        let toml = format!(
            "{}\n[database]\npath = {:?}\n",
            access_toml,
            db_path.to_string_lossy()
        );
        let config = load_config_from_str(&toml).expect("Invalid test config");

        let stores = LifecycleStores::sqlite(&db_path).expect("Failed to open stores");
        let event_store: Arc<dyn EventStore> =
            Arc::new(SqliteEventStore::new(&db_path).expect("Failed to open event store"));
        let (events, writer) = create_event_system(Arc::clone(&event_store), 1000);
        tokio::spawn(writer.run());

        let lifecycle =
            build_lifecycle(&config, stores, events).expect("Failed to build lifecycle");
        let state = Arc::new(AppState::new(config, lifecycle, Arc::clone(&event_store)));

        Self {
            router: create_router(state),
            event_store,
            temp_dir,
            actor: ("u-admin".to_string(), "admin".to_string()),
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let (id, role) = self.actor.clone();
        self.request("GET", path, None, Some((&id, &role))).await
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        let (id, role) = self.actor.clone();
        self.request("POST", path, Some(body), Some((&id, &role)))
            .await
    }

    /// POST as a specific actor.
    pub async fn post_as(&self, id: &str, role: &str, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), Some((id, role))).await
    }

    /// POST without any actor headers.
    pub async fn post_anonymous(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body), None).await
    }

    /// GET returning the raw body text, for non-JSON endpoints.
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
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    /// Register an asset and return its id.
    pub async fn register_asset(&self, barcode: &str) -> String {
        let response = self
            .post(
                "/api/v1/assets",
                json!({
                    "name": format!("Laptop {}", barcode),
                    "barcode": barcode,
                    "category_id": "laptops",
                    "department_id": "it"
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    /// Open a ticket about `asset_id` and return its id.
    pub async fn open_ticket(&self, asset_id: &str) -> String {
        let response = self
            .post(
                "/api/v1/tickets",
                json!({
                    "title": "Screen flickers",
                    "description": "Flickers when the lid moves",
                    "asset_id": asset_id
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"].as_str().unwrap().to_string()
    }

    pub async fn asset_status(&self, asset_id: &str) -> String {
        let response = self.get(&format!("/api/v1/assets/{}", asset_id)).await;
        response.body["status"].as_str().unwrap().to_string()
    }

    /// Poll the event log until at least `count` events of `event_type` are stored.
    pub async fn wait_for_events(&self, event_type: &str, count: usize) -> Value {
        for _ in 0..100 {
            let response = self
                .get(&format!("/api/v1/events?event_type={}", event_type))
                .await;
            if response.body["events"].as_array().map_or(0, Vec::len) >= count {
                return response.body;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("Timed out waiting for {} {} events", count, event_type);
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        actor: Option<(&str, &str)>,
    ) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        if let Some((id, role)) = actor {
            request_builder = request_builder
                .header("X-Actor-Id", id)
                .header("X-Actor-Role", role);
        }

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
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
