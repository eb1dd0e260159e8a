//! Runtime attachment and detachment of plugin routes.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use super::components::{ComponentRegistry, component_key};
use super::controller::ControllerDescriptor;
use super::definition::RouteKey;
use super::table::{DispatchTable, RouteEntry, RouteRemovalError};

/// Outcome of detaching one controller from the dispatch table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnregisterReport {
    /// Component keys that were removed.
    pub components: Vec<String>,
    /// Routes removed from the table.
    pub removed: Vec<String>,
    /// Routes that were already gone.
    pub absent: Vec<String>,
    /// Routes that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
}

impl UnregisterReport {
    /// Returns `true` if every declared route was removed.
    pub fn is_clean(&self) -> bool {
        self.absent.is_empty() && self.failed.is_empty()
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: UnregisterReport) {
        self.components.extend(other.components);
        self.removed.extend(other.removed);
        self.absent.extend(other.absent);
        self.failed.extend(other.failed);
    }
}

/// Attaches controller instances and their routes to the shared dispatch
/// table, and detaches them again.
#[derive(Debug, Clone)]
pub struct RouteRegistrar {
    table: Arc<DispatchTable>,
    components: Arc<ComponentRegistry>,
}

impl RouteRegistrar {
    /// Creates a registrar over shared state.
    pub fn new(table: Arc<DispatchTable>, components: Arc<ComponentRegistry>) -> Self {
        Self { table, components }
    }

    /// The dispatch table this registrar mutates.
    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    /// The component registry this registrar mutates.
    pub fn components(&self) -> &Arc<ComponentRegistry> {
        &self.components
    }

    /// Registers a fresh instance of `descriptor` for `plugin_id` and makes
    /// its routes resolvable.
    ///
    /// The instance is registered before any route is inserted, and all
    /// routes go in under one write lock. On failure nothing is left
    /// registered.
    pub async fn register_plugin(
        &self,
        plugin_id: &str,
        descriptor: &ControllerDescriptor,
    ) -> AppResult<Vec<RouteKey>> {
        if plugin_id.trim().is_empty() {
            return Err(AppError::validation("Plugin id must not be empty"));
        }

        let key = component_key(plugin_id, descriptor.type_name());

        let mut parsed = Vec::with_capacity(descriptor.routes().len());
        for mapping in descriptor.routes() {
            let (route_key, pattern) = mapping.route_key()?;
            parsed.push((route_key, pattern, mapping.handler));
        }

        let instance = descriptor.instantiate()?;
        self.components
            .register(&key, Arc::clone(&instance))
            .await?;

        let keys: Vec<RouteKey> = parsed.iter().map(|(k, _, _)| k.clone()).collect();
        let entries = parsed
            .into_iter()
            .map(|(route_key, pattern, handler)| {
                let entry = RouteEntry {
                    owner: key.clone(),
                    plugin_id: plugin_id.to_string(),
                    handler: handler.to_string(),
                    pattern,
                    controller: Arc::clone(&instance),
                };
                (route_key, entry)
            })
            .collect();

        if let Err(e) = self.table.insert_all(entries).await {
            self.components.remove(&key).await;
            warn!(component = %key, error = %e, "Route registration rolled back");
            return Err(e);
        }

        info!(
            plugin_id = %plugin_id,
            component = %key,
            routes = keys.len(),
            "Plugin controller registered"
        );
        Ok(keys)
    }

    /// Removes the instance of `descriptor` registered for `plugin_id`
    /// together with its routes.
    ///
    /// Each route is removed independently; failures are logged and
    /// reported, never rolled back. The instance is removed last.
    pub async fn unregister_plugin(
        &self,
        plugin_id: &str,
        descriptor: &ControllerDescriptor,
    ) -> AppResult<UnregisterReport> {
        let key = component_key(plugin_id, descriptor.type_name());

        if !self.components.contains(&key).await {
            warn!(plugin_id = %plugin_id, component = %key, "No registered instance to unregister");
            return Err(AppError::not_found(format!(
                "Component '{key}' is not registered"
            )));
        }

        let mut report = UnregisterReport::default();

        for mapping in descriptor.routes() {
            let route_key = match mapping.route_key() {
                Ok((route_key, _)) => route_key,
                Err(e) => {
                    error!(component = %key, path = %mapping.path, error = %e, "Cannot compute route key");
                    report
                        .failed
                        .push((format!("{} {}", mapping.method, mapping.path), e.message));
                    continue;
                }
            };

            match self.table.remove(&route_key, &key).await {
                Ok(()) => report.removed.push(route_key.to_string()),
                Err(RouteRemovalError::Absent) => {
                    warn!(component = %key, route = %route_key, "Route already absent");
                    report.absent.push(route_key.to_string());
                }
                Err(e @ RouteRemovalError::OwnedBy(_)) => {
                    error!(component = %key, route = %route_key, error = %e, "Failed to remove route");
                    report.failed.push((route_key.to_string(), e.to_string()));
                }
            }
        }

        if self.components.remove(&key).await.is_some() {
            report.components.push(key.clone());
        } else {
            debug!(component = %key, "Component removed concurrently");
        }

        info!(
            plugin_id = %plugin_id,
            component = %key,
            removed = report.removed.len(),
            absent = report.absent.len(),
            failed = report.failed.len(),
            "Plugin controller unregistered"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::controller::{Controller, PluginController, PluginRequest, PluginResponse};
    use crate::routes::definition::RouteMapping;
    use async_trait::async_trait;
    use http::Method;
    use plughub_core::error::ErrorKind;

    #[derive(Debug)]
    struct WeatherHandler;

    #[async_trait]
    impl Controller for WeatherHandler {
        async fn handle(&self, handler: &str, request: PluginRequest) -> AppResult<PluginResponse> {
            PluginResponse::ok(&serde_json::json!({
                "handler": handler,
                "city": request.param("city"),
            }))
        }
    }

    impl PluginController for WeatherHandler {
        fn type_name() -> &'static str {
            "WeatherHandler"
        }

        fn create() -> Self {
            Self
        }

        fn routes() -> Vec<RouteMapping> {
            vec![
                RouteMapping::get("current", "/weather/current"),
                RouteMapping::get("forecast", "/weather/forecast/{city}"),
            ]
        }
    }

    fn registrar() -> RouteRegistrar {
        RouteRegistrar::new(
            Arc::new(DispatchTable::new()),
            Arc::new(ComponentRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_registered_routes_resolve_immediately() {
        let registrar = registrar();
        let descriptor = ControllerDescriptor::of::<WeatherHandler>();

        let keys = registrar.register_plugin("weather", &descriptor).await.unwrap();
        assert_eq!(keys.len(), 2);
        assert!(registrar.components().contains("weather_WeatherHandler").await);

        let hit = registrar
            .table()
            .resolve(&Method::GET, "/weather/current")
            .await
            .unwrap();
        assert_eq!(hit.owner, "weather_WeatherHandler");
        assert_eq!(hit.plugin_id, "weather");

        let hit = registrar
            .table()
            .resolve(&Method::GET, "/weather/forecast/oslo")
            .await
            .unwrap();
        let response = hit
            .controller
            .handle(&hit.handler, {
                let mut request = PluginRequest::new(Method::GET, "/weather/forecast/oslo");
                request.params = hit.params.clone();
                request
            })
            .await
            .unwrap();
        assert_eq!(response.body["city"], "oslo");
    }

    #[tokio::test]
    async fn test_unregister_removes_routes_and_second_call_is_not_found() {
        let registrar = registrar();
        let descriptor = ControllerDescriptor::of::<WeatherHandler>();
        registrar.register_plugin("weather", &descriptor).await.unwrap();

        let report = registrar.unregister_plugin("weather", &descriptor).await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.components, vec!["weather_WeatherHandler".to_string()]);

        assert!(registrar.table().resolve(&Method::GET, "/weather/current").await.is_none());
        assert!(
            registrar
                .table()
                .resolve(&Method::GET, "/weather/forecast/oslo")
                .await
                .is_none()
        );
        assert!(registrar.components().is_empty().await);

        let err = registrar
            .unregister_plugin("weather", &descriptor)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_same_type_for_two_plugins_conflicts_on_routes() {
        let registrar = registrar();
        let descriptor = ControllerDescriptor::of::<WeatherHandler>();
        registrar.register_plugin("weather", &descriptor).await.unwrap();

        let err = registrar
            .register_plugin("weather-copy", &descriptor)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert!(!registrar.components().contains("weather-copy_WeatherHandler").await);
        assert_eq!(registrar.table().len().await, 2);

        let err = registrar
            .register_plugin("weather", &descriptor)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(registrar.components().len().await, 1);
    }

    #[tokio::test]
    async fn test_malformed_route_registers_nothing() {
        let registrar = registrar();
        let descriptor = ControllerDescriptor::new(
            "Broken",
            vec![
                RouteMapping::get("ok", "/fine"),
                RouteMapping::get("bad", "/broken/{"),
            ],
            || Ok(Arc::new(WeatherHandler) as Arc<dyn Controller>),
        );

        let err = registrar.register_plugin("p", &descriptor).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(registrar.components().is_empty().await);
        assert!(registrar.table().is_empty().await);

        let err = registrar.register_plugin(" ", &descriptor).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unregister_isolates_route_failures() {
        let registrar = registrar();
        let descriptor = ControllerDescriptor::of::<WeatherHandler>();
        registrar.register_plugin("weather", &descriptor).await.unwrap();

        // Another component takes over one of the routes.
        let (current, _) = RouteMapping::get("current", "/weather/current")
            .route_key()
            .unwrap();
        registrar
            .table()
            .remove(&current, "weather_WeatherHandler")
            .await
            .unwrap();
        let (key, pattern) = RouteMapping::get("current", "/weather/current")
            .route_key()
            .unwrap();
        registrar
            .table()
            .insert_all(vec![(
                key,
                RouteEntry {
                    owner: "other_Thing".into(),
                    plugin_id: "other".into(),
                    handler: "current".into(),
                    pattern,
                    controller: Arc::new(WeatherHandler),
                },
            )])
            .await
            .unwrap();

        let descriptor_with_extra = ControllerDescriptor::new(
            "WeatherHandler",
            vec![
                RouteMapping::get("current", "/weather/current"),
                RouteMapping::get("forecast", "/weather/forecast/{city}"),
                RouteMapping::get("gone", "/weather/history"),
                RouteMapping::get("bad", "/weather/{"),
            ],
            || Ok(Arc::new(WeatherHandler) as Arc<dyn Controller>),
        );

        let report = registrar
            .unregister_plugin("weather", &descriptor_with_extra)
            .await
            .unwrap();
        assert_eq!(report.removed, vec!["GET /weather/forecast/{}".to_string()]);
        assert_eq!(report.absent, vec!["GET /weather/history".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert!(!report.is_clean());

        assert!(!registrar.components().contains("weather_WeatherHandler").await);
        let hit = registrar
            .table()
            .resolve(&Method::GET, "/weather/current")
            .await
            .unwrap();
        assert_eq!(hit.owner, "other_Thing");
    }

    #[test]
    fn test_report_merge() {
        let mut report = UnregisterReport {
            removed: vec!["GET /a".into()],
            ..Default::default()
        };
        report.merge(UnregisterReport {
            absent: vec!["GET /b".into()],
            ..Default::default()
        });
        assert_eq!(report.removed.len(), 1);
        assert_eq!(report.absent.len(), 1);
        assert!(!report.is_clean());
    }
}
