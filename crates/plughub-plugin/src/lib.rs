//! # plughub-plugin
//!
//! Plugin framework for PlugHub. Provides:
//!
//! - Composable path filters and a directory scanner contract
//! - In-place expansion of `.zip` plugin archives
//! - Plugin repositories over one or several plugin roots
//! - Declarative controller route tables and the live dispatch table
//! - Runtime registration and unregistration of plugin routes
//! - Plugin manifests, the compiled-in controller catalog, and the
//!   lifecycle manager tying them together
//! - A background service that rescans the plugin roots

pub mod archive;
pub mod catalog;
pub mod error;
pub mod filter;
pub mod manager;
pub mod manifest;
pub mod prelude;
pub mod repository;
pub mod rescan;
pub mod routes;
pub mod scanner;

pub use archive::{ArchiveExpander, ExpansionReport, ExtractionLimits};
pub use catalog::ControllerCatalog;
pub use error::ArchiveError;
pub use filter::PathFilter;
pub use manager::{PluginManager, PluginRecord, PluginState, RescanReport};
pub use manifest::PluginManifest;
pub use repository::{CompoundPluginRepository, DefaultPluginRepository, PluginRepository};
pub use rescan::RescanService;
pub use routes::{
    ComponentRegistry, Controller, ControllerDescriptor, DispatchTable, PluginController,
    PluginRequest, PluginResponse, RouteMapping, RouteRegistrar, UnregisterReport,
};
pub use scanner::{DirectoryScanner, FsDirectoryScanner};
