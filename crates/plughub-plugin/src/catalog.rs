//! Compiled-in controller types, grouped by the plugin id that contributes
//! them.

use dashmap::DashMap;
use tracing::debug;

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use crate::routes::ControllerDescriptor;

/// Plugin id → controller descriptors, in registration order.
#[derive(Debug, Default)]
pub struct ControllerCatalog {
    entries: DashMap<String, Vec<ControllerDescriptor>>,
}

impl ControllerCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a controller type for `plugin_id`.
    ///
    /// Fails with a conflict if the plugin already has a controller of the
    /// same type name. Plugin ids may not contain `_`, the separator of
    /// component keys, so `a_b`/`C` and `a`/`b_C` never share a key.
    pub fn register(&self, plugin_id: &str, descriptor: ControllerDescriptor) -> AppResult<()> {
        if plugin_id.trim().is_empty() {
            return Err(AppError::validation("Plugin id must not be empty"));
        }
        if plugin_id.contains('_') {
            return Err(AppError::validation(format!(
                "Plugin id '{plugin_id}' must not contain '_'"
            )));
        }

        let mut entry = self.entries.entry(plugin_id.to_string()).or_default();
        if entry
            .iter()
            .any(|d| d.type_name() == descriptor.type_name())
        {
            return Err(AppError::conflict(format!(
                "Controller '{}' is already catalogued for plugin '{plugin_id}'",
                descriptor.type_name()
            )));
        }

        debug!(
            plugin_id = %plugin_id,
            controller = descriptor.type_name(),
            "Controller catalogued"
        );
        entry.push(descriptor);
        Ok(())
    }

    /// All controller types of a plugin.
    pub fn controllers(&self, plugin_id: &str) -> Vec<ControllerDescriptor> {
        self.entries
            .get(plugin_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// One controller type of a plugin.
    pub fn find(&self, plugin_id: &str, type_name: &str) -> Option<ControllerDescriptor> {
        self.entries
            .get(plugin_id)
            .and_then(|e| e.iter().find(|d| d.type_name() == type_name).cloned())
    }

    /// Plugin ids with at least one controller, sorted.
    pub fn plugin_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}
