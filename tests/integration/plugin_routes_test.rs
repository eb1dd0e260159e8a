//! Plugin routes appearing and disappearing on the HTTP surface.

use http::StatusCode;
use serde_json::json;

use crate::helpers::{TestApp, write_bundle};

#[tokio::test]
async fn test_weather_routes_follow_plugin_lifecycle() {
    let app = TestApp::new();
    std::fs::create_dir(app.root().join("weather")).unwrap();

    let response = app.request("GET", "/plugin/weather/current?city=oslo", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    app.manager.discover().await.unwrap();
    app.manager.load("weather").await.unwrap();

    let response = app.request("GET", "/plugin/weather/current?city=oslo", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["city"], "oslo");

    let response = app
        .request("GET", "/plugin/weather/forecast/lisbon?days=2", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["days"].as_array().map(Vec::len), Some(2));

    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.body["data"]["plugins_registered"], 1);
    assert_eq!(response.body["data"]["routes"], 4);

    app.manager.unload("weather").await.unwrap();

    let response = app.request("GET", "/plugin/weather/current?city=oslo", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_bundle_is_expanded_and_served() {
    let app = TestApp::new();
    write_bundle(
        &app.root().join("weather.zip"),
        &[("plugin.json", r#"{"name":"Weather","controllers":["WeatherController"]}"#)],
    );

    let found = app.manager.discover().await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, "weather");
    assert!(app.root().join("weather").is_dir());

    assert_eq!(app.manager.load_all().await, vec!["weather".to_string()]);

    let response = app
        .request(
            "POST",
            "/plugin/weather/reports",
            Some(json!({ "city": "Nuuk", "temperature_c": -8.0, "humidity": 70 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app.request("GET", "/plugin/weather/current?city=nuuk", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["temperature_c"], -8.0);
}

#[tokio::test]
async fn test_plugin_errors_map_to_status_codes() {
    let app = TestApp::new();
    std::fs::create_dir(app.root().join("weather")).unwrap();
    app.manager.discover().await.unwrap();
    app.manager.load("weather").await.unwrap();

    let response = app.request("GET", "/plugin/weather/current", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");

    let response = app
        .request("GET", "/plugin/weather/current?city=atlantis", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("DELETE", "/plugin/weather/current", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
