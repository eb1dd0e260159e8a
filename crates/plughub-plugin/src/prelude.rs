//! Prelude for plugin crates.

pub use async_trait::async_trait;

pub use plughub_core::error::AppError;
pub use plughub_core::result::AppResult;

pub use crate::catalog::ControllerCatalog;
pub use crate::routes::{
    Controller, ControllerDescriptor, PluginController, PluginRequest, PluginResponse,
    RouteMapping,
};
