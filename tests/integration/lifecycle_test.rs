//! Discovery, hidden directories, and deletion across the plugin root.

use plughub_plugin::{PluginRepository, PluginState};

use crate::helpers::{TestApp, write_bundle};

#[tokio::test]
async fn test_hidden_directories_are_never_discovered() {
    let app = TestApp::new();
    std::fs::create_dir(app.root().join(".cache")).unwrap();
    std::fs::create_dir(app.root().join("weather")).unwrap();
    std::fs::write(app.root().join("notes.txt"), "not a plugin").unwrap();

    let found = app.manager.discover().await.unwrap();
    let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["weather"]);
}

#[tokio::test]
async fn test_directory_and_bundle_are_both_listed() {
    let app = TestApp::new();
    std::fs::create_dir(app.root().join("alpha")).unwrap();
    write_bundle(&app.root().join("beta.zip"), &[("README", "beta")]);

    let found = app.manager.discover().await.unwrap();
    let ids: Vec<_> = found.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "beta"]);

    // Neither has compiled-in controllers.
    assert!(app.manager.load("alpha").await.is_err());
    assert_eq!(app.manager.state("alpha").await, PluginState::Discovered);
}

#[tokio::test]
async fn test_delete_registered_plugin_removes_routes_and_files() {
    let app = TestApp::new();
    write_bundle(&app.root().join("weather.zip"), &[("README", "weather")]);

    app.manager.discover().await.unwrap();
    app.manager.load("weather").await.unwrap();

    assert!(app.manager.delete("weather").await.unwrap());
    assert!(!app.root().join("weather").exists());
    assert!(!app.root().join("weather.zip").exists());
    assert_eq!(app.manager.state("weather").await, PluginState::Unloaded);

    let response = app.request("GET", "/plugin/weather/cities", None).await;
    assert_eq!(response.status, http::StatusCode::NOT_FOUND);

    assert!(app.manager.discover().await.unwrap().is_empty());
}

#[test]
fn test_deleting_directory_without_bundle_succeeds() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("solo")).unwrap();

    let repository = plughub_plugin::DefaultPluginRepository::new(
        root.path(),
        plughub_plugin::ExtractionLimits::default(),
    );
    assert!(repository.delete_path(&root.path().join("solo")));
    assert!(repository.list_paths().is_empty());
}
