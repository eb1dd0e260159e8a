//! Plugin system configuration.

use serde::{Deserialize, Serialize};

/// Runtime mode of the plugin host.
///
/// In development mode an additional plugin root (usually a build output
/// directory) is scanned alongside the configured ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginMode {
    /// Normal deployment.
    #[default]
    Runtime,
    /// Local development.
    Development,
}

impl PluginMode {
    /// Returns `true` in development mode.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Plugin roots scanned for plugin directories and `.zip` bundles.
    #[serde(default = "default_plugin_directories")]
    pub directories: Vec<String>,
    /// Extra root scanned only in development mode.
    #[serde(default)]
    pub development_directory: Option<String>,
    /// Runtime mode.
    #[serde(default)]
    pub mode: PluginMode,
    /// Whether to discover and load plugins on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
    /// Seconds between background rescans of the plugin roots; `0` disables.
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_seconds: u64,
    /// Path prefix under which plugin routes are mounted.
    #[serde(default = "default_route_prefix")]
    pub route_prefix: String,
    /// Maximum number of entries accepted in a plugin archive.
    #[serde(default = "default_max_archive_entries")]
    pub max_archive_entries: usize,
    /// Maximum total uncompressed size of a plugin archive, in bytes.
    #[serde(default = "default_max_extracted_bytes")]
    pub max_extracted_bytes: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directories: default_plugin_directories(),
            development_directory: None,
            mode: PluginMode::default(),
            auto_load: default_true(),
            rescan_interval_seconds: default_rescan_interval(),
            route_prefix: default_route_prefix(),
            max_archive_entries: default_max_archive_entries(),
            max_extracted_bytes: default_max_extracted_bytes(),
        }
    }
}

fn default_plugin_directories() -> Vec<String> {
    vec!["./plugins".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_rescan_interval() -> u64 {
    30
}

fn default_route_prefix() -> String {
    "/plugin".to_string()
}

fn default_max_archive_entries() -> usize {
    10_000
}

fn default_max_extracted_bytes() -> u64 {
    1024 * 1024 * 1024
}
