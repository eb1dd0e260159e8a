//! Catalog registration of the weather plugin.

use plughub_plugin::prelude::*;

use crate::controller::WeatherController;

/// Plugin id under which the weather controllers are catalogued.
pub const PLUGIN_ID: &str = "weather";

/// Controller types contributed by the plugin.
pub fn descriptors() -> Vec<ControllerDescriptor> {
    vec![ControllerDescriptor::of::<WeatherController>()]
}

/// Adds the plugin's controller types to `catalog`.
pub fn register(catalog: &ControllerCatalog) -> AppResult<()> {
    for descriptor in descriptors() {
        catalog.register(PLUGIN_ID, descriptor)?;
    }

    tracing::info!(plugin_id = PLUGIN_ID, "Weather plugin catalogued");
    Ok(())
}
