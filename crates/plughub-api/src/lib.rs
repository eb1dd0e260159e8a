//! # plughub-api
//!
//! HTTP API layer for PlugHub built on Axum.
//!
//! Serves the host endpoints under `/api` and forwards every request under
//! the configured plugin prefix to the live dispatch table, so plugin routes
//! appear and disappear without rebuilding the router.

pub mod app;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use error::ApiError;
pub use state::AppState;
