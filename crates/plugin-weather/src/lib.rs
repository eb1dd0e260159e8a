//! Weather plugin for PlugHub.
//!
//! Contributes a `WeatherController` serving current conditions, simple
//! forecasts, and observation reports under `/weather/...`. The controller is
//! compiled in and catalogued under the plugin id `weather`; dropping a
//! `weather/` directory (or `weather.zip`) into a plugin root makes the host
//! attach its routes.

pub mod controller;
pub mod plugin;
pub mod station;

pub use controller::WeatherController;
pub use plugin::{PLUGIN_ID, descriptors, register};
pub use station::WeatherStation;
