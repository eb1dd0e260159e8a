//! Live HTTP routes contributed by plugins.
//!
//! - [`definition`]: route patterns and the declarative route tables of
//!   controller types
//! - [`controller`]: the controller contract and its type descriptors
//! - [`components`]: live controller instances keyed per plugin
//! - [`table`]: the shared dispatch table read on every request
//! - [`registrar`]: attaches and detaches a plugin's routes at runtime

pub mod components;
pub mod controller;
pub mod definition;
pub mod registrar;
pub mod table;

pub use components::{ComponentRegistry, component_key};
pub use controller::{
    Controller, ControllerDescriptor, PluginController, PluginRequest, PluginResponse,
};
pub use definition::{PathPattern, RouteKey, RouteMapping};
pub use registrar::{RouteRegistrar, UnregisterReport};
pub use table::{DispatchTable, ResolvedRoute, RouteEntry, RouteRemovalError, RouteSummary};
