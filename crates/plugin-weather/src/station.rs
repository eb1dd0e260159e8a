//! In-memory weather observations.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

/// Longest forecast the station produces, in days.
pub const MAX_FORECAST_DAYS: u32 = 7;

/// A single observation for a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Normalized city name.
    pub city: String,
    /// Temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Relative humidity, 0–100.
    pub humidity: u8,
    /// Free-form conditions ("clear", "rain", ...).
    pub conditions: String,
    /// When the observation was made.
    pub observed_at: DateTime<Utc>,
}

/// One day of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDay {
    /// Forecast date.
    pub date: chrono::NaiveDate,
    /// Expected high, °C.
    pub high_c: f64,
    /// Expected low, °C.
    pub low_c: f64,
    /// Expected conditions.
    pub conditions: String,
}

/// Latest observation per city.
#[derive(Debug, Default)]
pub struct WeatherStation {
    observations: RwLock<HashMap<String, Observation>>,
}

impl WeatherStation {
    /// Creates an empty station.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a station with a few starting observations.
    pub fn seeded() -> Self {
        let now = Utc::now();
        let seed = [
            ("oslo", 4.5, 81, "overcast"),
            ("lisbon", 19.0, 63, "clear"),
            ("tokyo", 14.2, 70, "rain"),
        ];

        let observations = seed
            .into_iter()
            .map(|(city, temperature_c, humidity, conditions)| {
                (
                    city.to_string(),
                    Observation {
                        city: city.to_string(),
                        temperature_c,
                        humidity,
                        conditions: conditions.to_string(),
                        observed_at: now,
                    },
                )
            })
            .collect();

        Self {
            observations: RwLock::new(observations),
        }
    }

    /// Records an observation, replacing the previous one for the city.
    pub async fn record(&self, mut observation: Observation) -> AppResult<Observation> {
        observation.city = normalize_city(&observation.city)?;
        if observation.humidity > 100 {
            return Err(AppError::validation("Humidity must be between 0 and 100"));
        }

        self.observations
            .write()
            .await
            .insert(observation.city.clone(), observation.clone());
        Ok(observation)
    }

    /// Latest observation for a city.
    pub async fn current(&self, city: &str) -> AppResult<Observation> {
        let city = normalize_city(city)?;
        self.observations
            .read()
            .await
            .get(&city)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("No observations for '{city}'")))
    }

    /// Forecast derived from the latest observation.
    ///
    /// Highs and lows drift by a fixed amount per day around the observed
    /// temperature.
    pub async fn forecast(&self, city: &str, days: u32) -> AppResult<Vec<ForecastDay>> {
        if days == 0 || days > MAX_FORECAST_DAYS {
            return Err(AppError::validation(format!(
                "Forecast length must be between 1 and {MAX_FORECAST_DAYS} days"
            )));
        }

        let base = self.current(city).await?;
        let today = base.observed_at.date_naive();

        Ok((1..=days)
            .map(|offset| {
                let drift = f64::from(offset) * 0.5;
                ForecastDay {
                    date: today + Duration::days(i64::from(offset)),
                    high_c: round1(base.temperature_c + 3.0 + drift),
                    low_c: round1(base.temperature_c - 3.0 - drift),
                    conditions: base.conditions.clone(),
                }
            })
            .collect())
    }

    /// Cities with observations, sorted.
    pub async fn cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self.observations.read().await.keys().cloned().collect();
        cities.sort();
        cities
    }
}

fn normalize_city(city: &str) -> AppResult<String> {
    let city = city.trim().to_lowercase();
    if city.is_empty() {
        return Err(AppError::validation("City must not be empty"));
    }
    Ok(city)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use plughub_core::error::ErrorKind;

    #[tokio::test]
    async fn test_record_and_current() {
        let station = WeatherStation::new();
        station
            .record(Observation {
                city: " Bergen ".into(),
                temperature_c: 7.0,
                humidity: 90,
                conditions: "rain".into(),
                observed_at: Utc::now(),
            })
            .await
            .unwrap();

        let current = station.current("BERGEN").await.unwrap();
        assert_eq!(current.city, "bergen");
        assert_eq!(station.cities().await, vec!["bergen".to_string()]);

        let err = station.current("paris").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_forecast_bounds() {
        let station = WeatherStation::seeded();

        let days = station.forecast("lisbon", 3).await.unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].high_c, 22.5);
        assert_eq!(days[0].low_c, 15.5);
        assert!(days[1].date > days[0].date);

        for bad in [0, MAX_FORECAST_DAYS + 1] {
            let err = station.forecast("lisbon", bad).await.unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_invalid_observation_is_rejected() {
        let station = WeatherStation::new();
        let err = station
            .record(Observation {
                city: "".into(),
                temperature_c: 0.0,
                humidity: 10,
                conditions: "clear".into(),
                observed_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
