//! Route definitions for the PlugHub HTTP API.
//!
//! Host endpoints are mounted under `/api`. Everything under the configured
//! plugin prefix goes to a single catch-all handler that consults the live
//! dispatch table.

use axum::{
    Router,
    routing::{any, get},
};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    let prefix = state.plugin_prefix.clone();

    Router::new()
        .nest("/api", health_routes())
        .route(
            &format!("{prefix}/{{*rest}}"),
            any(handlers::plugin::dispatch),
        )
        .fallback(handlers::plugin::not_found)
        .with_state(state)
}

/// Health endpoints
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}

/// `/plugin/` → `/plugin`, `plugin` → `/plugin`, `/` → ``.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
