//! Shared test helpers for integration tests.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use plughub_api::{AppState, build_app};
use plughub_core::config::AppConfig;
use plughub_plugin::{
    ComponentRegistry, CompoundPluginRepository, ControllerCatalog, DispatchTable, PluginManager,
    RouteRegistrar,
};

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Plugin lifecycle manager behind the router
    pub manager: Arc<PluginManager>,
    /// Plugin root, removed on drop
    pub root: TempDir,
}

impl TestApp {
    /// Create a new test application over an empty plugin root
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create plugin root");

        let mut config = AppConfig::default();
        config.plugins.directories = vec![root.path().display().to_string()];

        let repository =
            CompoundPluginRepository::from_config(&config.plugins).expect("Invalid plugin config");

        let catalog = Arc::new(ControllerCatalog::new());
        plugin_weather::register(&catalog).expect("Failed to catalogue weather plugin");

        let registrar = RouteRegistrar::new(
            Arc::new(DispatchTable::new()),
            Arc::new(ComponentRegistry::new()),
        );
        let manager = Arc::new(PluginManager::new(Arc::new(repository), catalog, registrar));

        let state = AppState::new(Arc::new(config), Arc::clone(&manager));

        Self {
            router: build_app(state),
            manager,
            root,
        }
    }

    /// Path of the plugin root
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Make a request
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("Response body is not JSON")
        };

        TestResponse { status, body }
    }
}

/// Test response wrapper
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Writes a `.zip` plugin bundle with the given `(name, contents)` entries.
pub fn write_bundle(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).expect("Failed to create bundle");
    let mut zip = ZipWriter::new(file);

    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start entry");
        zip.write_all(contents.as_bytes())
            .expect("Failed to write entry");
    }

    zip.finish().expect("Failed to finish bundle");
}
