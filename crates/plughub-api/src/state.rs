//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use plughub_core::config::AppConfig;
use plughub_plugin::{DispatchTable, PluginManager};

use crate::router::normalize_prefix;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Live plugin routes, read on every plugin request
    pub routes: Arc<DispatchTable>,
    /// Normalized plugin route prefix (`/plugin`, or empty for the root)
    pub plugin_prefix: String,
    /// Plugin lifecycle manager
    pub plugins: Arc<PluginManager>,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state. The dispatch table is taken from the manager's
    /// registrar so both always see the same routes.
    pub fn new(config: Arc<AppConfig>, plugins: Arc<PluginManager>) -> Self {
        Self {
            plugin_prefix: normalize_prefix(&config.plugins.route_prefix),
            config,
            routes: Arc::clone(plugins.registrar().table()),
            plugins,
            started_at: Instant::now(),
        }
    }
}
