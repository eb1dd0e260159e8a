//! Controller contract for plugin HTTP handlers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use plughub_core::error::{AppError, ErrorKind};
use plughub_core::result::AppResult;

use super::definition::RouteMapping;

/// A request routed to a plugin controller.
#[derive(Debug, Clone)]
pub struct PluginRequest {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the plugin route prefix.
    pub path: String,
    /// Values captured by `{name}` pattern segments.
    pub params: HashMap<String, String>,
    /// Decoded query string parameters.
    pub query: HashMap<String, String>,
    /// Request headers.
    pub headers: HeaderMap,
    /// Raw request body.
    pub body: Bytes,
}

impl PluginRequest {
    /// Creates a request with no parameters, headers, or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: HashMap::new(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Returns a captured path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Returns a captured path parameter or a validation error.
    pub fn require_param(&self, name: &str) -> AppResult<&str> {
        self.param(name)
            .ok_or_else(|| AppError::validation(format!("Missing path parameter '{name}'")))
    }

    /// Returns a query string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            AppError::with_source(
                ErrorKind::Validation,
                format!("Invalid JSON body: {e}"),
                e,
            )
        })
    }
}

/// A controller's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// JSON body.
    pub body: serde_json::Value,
}

impl PluginResponse {
    /// Response with an explicit status.
    pub fn new(status: StatusCode, body: serde_json::Value) -> Self {
        Self { status, body }
    }

    /// `200 OK` with a serialized body.
    pub fn ok<T: Serialize>(body: &T) -> AppResult<Self> {
        Ok(Self::new(StatusCode::OK, serde_json::to_value(body)?))
    }

    /// `201 Created` with a serialized body.
    pub fn created<T: Serialize>(body: &T) -> AppResult<Self> {
        Ok(Self::new(StatusCode::CREATED, serde_json::to_value(body)?))
    }

    /// `204 No Content`.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT, serde_json::Value::Null)
    }
}

/// A live plugin handler instance.
///
/// The dispatcher calls `handle` with the identifier of the matched
/// [`RouteMapping`].
#[async_trait]
pub trait Controller: Send + Sync + fmt::Debug {
    /// Handles a routed request.
    async fn handle(&self, handler: &str, request: PluginRequest) -> AppResult<PluginResponse>;
}

/// A controller type with a declarative route table.
pub trait PluginController: Controller + Sized + 'static {
    /// Type name used in the component key (`<plugin>_<type name>`).
    fn type_name() -> &'static str;

    /// Builds a fresh instance.
    fn create() -> Self;

    /// The routes this type serves.
    fn routes() -> Vec<RouteMapping>;
}

type ControllerFactory = Arc<dyn Fn() -> AppResult<Arc<dyn Controller>> + Send + Sync>;

/// Type-erased description of a controller type: its name, how to build an
/// instance, and its route table.
#[derive(Clone)]
pub struct ControllerDescriptor {
    type_name: &'static str,
    factory: ControllerFactory,
    routes: Arc<[RouteMapping]>,
}

impl ControllerDescriptor {
    /// Describes a [`PluginController`] type. The route table is captured
    /// once here.
    pub fn of<T: PluginController>() -> Self {
        Self {
            type_name: T::type_name(),
            factory: Arc::new(instantiate::<T>),
            routes: T::routes().into(),
        }
    }

    /// Describes a controller type from its parts. The factory may fail,
    /// e.g. when the instance needs resources from the plugin directory.
    pub fn new<F>(type_name: &'static str, routes: Vec<RouteMapping>, factory: F) -> Self
    where
        F: Fn() -> AppResult<Arc<dyn Controller>> + Send + Sync + 'static,
    {
        Self {
            type_name,
            factory: Arc::new(factory),
            routes: routes.into(),
        }
    }

    /// The controller type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The declared route table.
    pub fn routes(&self) -> &[RouteMapping] {
        &self.routes
    }

    /// Builds a new instance.
    pub fn instantiate(&self) -> AppResult<Arc<dyn Controller>> {
        (self.factory)()
    }
}

fn instantiate<T: PluginController>() -> AppResult<Arc<dyn Controller>> {
    Ok(Arc::new(T::create()))
}

impl fmt::Debug for ControllerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDescriptor")
            .field("type_name", &self.type_name)
            .field("routes", &self.routes.len())
            .field("factory", &"<fn>")
            .finish()
    }
}
