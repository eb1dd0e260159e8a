//! HTTP controller of the weather plugin.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use plughub_plugin::prelude::*;

use crate::station::{Observation, WeatherStation};

const DEFAULT_FORECAST_DAYS: u32 = 3;

/// Body of `POST /weather/reports`.
#[derive(Debug, Deserialize)]
struct ReportRequest {
    city: String,
    temperature_c: f64,
    humidity: u8,
    #[serde(default = "default_conditions")]
    conditions: String,
}

fn default_conditions() -> String {
    "unknown".to_string()
}

/// Serves current conditions, forecasts, and observation reports.
#[derive(Debug)]
pub struct WeatherController {
    station: Arc<WeatherStation>,
}

impl WeatherController {
    /// Creates a controller over an existing station.
    pub fn with_station(station: Arc<WeatherStation>) -> Self {
        Self { station }
    }

    async fn current(&self, request: &PluginRequest) -> AppResult<PluginResponse> {
        let city = request
            .query_param("city")
            .ok_or_else(|| AppError::validation("Query parameter 'city' is required"))?;
        PluginResponse::ok(&self.station.current(city).await?)
    }

    async fn forecast(&self, request: &PluginRequest) -> AppResult<PluginResponse> {
        let city = request.require_param("city")?;
        let days = match request.query_param("days") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|_| AppError::validation(format!("Invalid forecast length '{raw}'")))?,
            None => DEFAULT_FORECAST_DAYS,
        };

        let forecast = self.station.forecast(city, days).await?;
        PluginResponse::ok(&json!({ "city": city.to_lowercase(), "days": forecast }))
    }

    async fn report(&self, request: &PluginRequest) -> AppResult<PluginResponse> {
        let body: ReportRequest = request.json()?;
        let observation = self
            .station
            .record(Observation {
                city: body.city,
                temperature_c: body.temperature_c,
                humidity: body.humidity,
                conditions: body.conditions,
                observed_at: Utc::now(),
            })
            .await?;

        tracing::info!(city = %observation.city, "Weather observation recorded");
        PluginResponse::created(&observation)
    }
}

#[async_trait]
impl Controller for WeatherController {
    async fn handle(&self, handler: &str, request: PluginRequest) -> AppResult<PluginResponse> {
        match handler {
            "current" => self.current(&request).await,
            "forecast" => self.forecast(&request).await,
            "report" => self.report(&request).await,
            "cities" => PluginResponse::ok(&json!({ "cities": self.station.cities().await })),
            other => Err(AppError::not_found(format!(
                "WeatherController has no handler '{other}'"
            ))),
        }
    }
}

impl PluginController for WeatherController {
    fn type_name() -> &'static str {
        "WeatherController"
    }

    fn create() -> Self {
        Self::with_station(Arc::new(WeatherStation::seeded()))
    }

    fn routes() -> Vec<RouteMapping> {
        vec![
            RouteMapping::get("current", "/weather/current"),
            RouteMapping::get("forecast", "/weather/forecast/{city}"),
            RouteMapping::post("report", "/weather/reports"),
            RouteMapping::get("cities", "/weather/cities"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use plughub_core::error::ErrorKind;

    fn report_request(raw: &str) -> PluginRequest {
        let mut request = PluginRequest::new(Method::POST, "/weather/reports");
        request.body = raw.as_bytes().to_vec().into();
        request
    }

    #[tokio::test]
    async fn test_current_requires_city() {
        let controller = WeatherController::create();

        let err = controller
            .handle("current", PluginRequest::new(Method::GET, "/weather/current"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut request = PluginRequest::new(Method::GET, "/weather/current");
        request.query.insert("city".into(), "Oslo".into());
        let response = controller.handle("current", request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["city"], "oslo");
    }

    #[tokio::test]
    async fn test_forecast_uses_path_and_query() {
        let controller = WeatherController::create();

        let mut request = PluginRequest::new(Method::GET, "/weather/forecast/tokyo");
        request.params.insert("city".into(), "tokyo".into());
        request.query.insert("days".into(), "5".into());
        let response = controller.handle("forecast", request).await.unwrap();
        assert_eq!(response.body["days"].as_array().map(Vec::len), Some(5));

        let mut request = PluginRequest::new(Method::GET, "/weather/forecast/tokyo");
        request.params.insert("city".into(), "tokyo".into());
        request.query.insert("days".into(), "soon".into());
        let err = controller.handle("forecast", request).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_report_then_read_back() {
        let controller = WeatherController::create();

        let response = controller
            .handle(
                "report",
                report_request(r#"{"city":"Reykjavik","temperature_c":-2.5,"humidity":75}"#),
            )
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.body["conditions"], "unknown");

        let response = controller
            .handle("cities", PluginRequest::new(Method::GET, "/weather/cities"))
            .await
            .unwrap();
        let cities = response.body["cities"].as_array().unwrap();
        assert!(cities.iter().any(|c| c == "reykjavik"));

        let err = controller
            .handle("missing", PluginRequest::new(Method::GET, "/"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
