//! Integration tests for the PlugHub server: plugin directories on disk,
//! the lifecycle manager, and the HTTP surface together.

mod helpers;
mod lifecycle_test;
mod plugin_routes_test;
