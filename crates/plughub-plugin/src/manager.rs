//! Plugin manager: host-side lifecycle of discovered plugins.
//!
//! Each plugin moves through `Unloaded → Discovered → Registered` and back.
//! Mutations of one plugin are serialized by a per-plugin mutex held across
//! the whole operation; different plugins proceed concurrently.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use crate::catalog::ControllerCatalog;
use crate::manifest::PluginManifest;
use crate::repository::PluginRepository;
use crate::routes::{ControllerDescriptor, RouteRegistrar, UnregisterReport, component_key};

/// Lifecycle state of a plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    /// Not known to the host.
    Unloaded,
    /// Found on disk, no routes attached.
    Discovered,
    /// Controllers registered, routes live.
    Registered,
}

/// What the host knows about one plugin.
#[derive(Debug, Clone, Serialize)]
pub struct PluginRecord {
    /// Plugin id.
    pub id: String,
    /// Plugin directory.
    pub path: PathBuf,
    /// Current state.
    pub state: PluginState,
    /// Manifest, or the fallback derived from the directory name.
    pub manifest: PluginManifest,
    /// Component keys of the registered controllers.
    pub components: Vec<String>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// Outcome of one [`PluginManager::rescan`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RescanReport {
    /// Plugins registered by this scan.
    pub loaded: Vec<String>,
    /// Registered plugins whose directory disappeared and were unloaded.
    pub unloaded: Vec<String>,
}

/// Manages discovery, loading, unloading, and deletion of plugins.
#[derive(Debug)]
pub struct PluginManager {
    /// Source of plugin directories.
    repository: Arc<dyn PluginRepository>,
    /// Compiled-in controller types.
    catalog: Arc<ControllerCatalog>,
    /// Attaches controllers to the dispatch table.
    registrar: RouteRegistrar,
    /// Plugin ID → record.
    records: RwLock<HashMap<String, PluginRecord>>,
    /// Plugin ID → lifecycle lock.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PluginManager {
    /// Creates a manager.
    pub fn new(
        repository: Arc<dyn PluginRepository>,
        catalog: Arc<ControllerCatalog>,
        registrar: RouteRegistrar,
    ) -> Self {
        Self {
            repository,
            catalog,
            registrar,
            records: RwLock::new(HashMap::new()),
            locks: DashMap::new(),
        }
    }

    /// The controller catalog.
    pub fn catalog(&self) -> &Arc<ControllerCatalog> {
        &self.catalog
    }

    /// The route registrar.
    pub fn registrar(&self) -> &RouteRegistrar {
        &self.registrar
    }

    /// Scans the repository and records every plugin found.
    ///
    /// New plugins become `Discovered`; registered plugins keep their
    /// state. Plugins that vanished from disk and are not registered are
    /// forgotten. Returns the records of the plugins found, sorted by id.
    pub async fn discover(&self) -> AppResult<Vec<PluginRecord>> {
        let repository = Arc::clone(&self.repository);
        let found = tokio::task::spawn_blocking(move || {
            repository
                .list_paths()
                .into_iter()
                .map(|path| {
                    let manifest = PluginManifest::resolve(&path);
                    (path, manifest)
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| AppError::internal(format!("Plugin discovery task failed: {e}")))?;

        let now = Utc::now();
        let mut records = self.records.write().await;
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for (path, manifest) in found {
            let manifest = match manifest {
                Ok(manifest) => manifest,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Skipping plugin with unreadable manifest");
                    continue;
                }
            };

            let id = manifest.id.clone();
            if let Some(first) = seen.get(&id) {
                warn!(
                    plugin_id = %id,
                    path = %path.display(),
                    first = %first.display(),
                    "Duplicate plugin id, keeping the first path"
                );
                continue;
            }
            seen.insert(id.clone(), path.clone());

            match records.get_mut(&id) {
                Some(record) if record.state == PluginState::Registered => {
                    debug!(plugin_id = %id, "Plugin already registered");
                }
                Some(record) => {
                    record.path = path;
                    record.manifest = manifest;
                    record.state = PluginState::Discovered;
                }
                None => {
                    info!(plugin_id = %id, path = %path.display(), "Plugin discovered");
                    records.insert(
                        id.clone(),
                        PluginRecord {
                            id,
                            path,
                            state: PluginState::Discovered,
                            manifest,
                            components: Vec::new(),
                            updated_at: now,
                        },
                    );
                }
            }
        }

        records.retain(|id, record| {
            let keep = seen.contains_key(id) || record.state == PluginState::Registered;
            if !keep {
                info!(plugin_id = %id, "Plugin no longer on disk");
            }
            keep
        });

        let mut discovered: Vec<PluginRecord> = records
            .values()
            .filter(|r| seen.contains_key(&r.id))
            .cloned()
            .collect();
        discovered.sort_by(|a, b| a.id.cmp(&b.id));

        info!(count = discovered.len(), "Plugin discovery complete");
        Ok(discovered)
    }

    /// Registers every controller of a discovered plugin.
    ///
    /// On failure the controllers registered so far are unregistered and the
    /// plugin stays `Discovered`.
    pub async fn load(&self, plugin_id: &str) -> AppResult<PluginRecord> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        let record = self.record(plugin_id).await?;
        if record.state != PluginState::Discovered {
            return Err(AppError::plugin(format!(
                "Plugin '{plugin_id}' cannot be loaded while {:?}",
                record.state
            )));
        }

        let descriptors = self.descriptors_for(&record.manifest)?;

        let mut registered: Vec<&ControllerDescriptor> = Vec::new();
        for descriptor in &descriptors {
            if let Err(e) = self.registrar.register_plugin(plugin_id, descriptor).await {
                error!(
                    plugin_id = %plugin_id,
                    controller = descriptor.type_name(),
                    error = %e,
                    "Plugin load failed, rolling back"
                );
                for done in registered.iter().rev() {
                    if let Err(rollback) = self.registrar.unregister_plugin(plugin_id, done).await {
                        warn!(
                            plugin_id = %plugin_id,
                            controller = done.type_name(),
                            error = %rollback,
                            "Rollback unregister failed"
                        );
                    }
                }
                return Err(e);
            }
            registered.push(descriptor);
        }

        let components = descriptors
            .iter()
            .map(|d| component_key(plugin_id, d.type_name()))
            .collect();
        let record = self
            .transition(&record, PluginState::Registered, components)
            .await;

        info!(
            plugin_id = %plugin_id,
            controllers = descriptors.len(),
            "Plugin loaded"
        );
        Ok(record)
    }

    /// Unregisters every controller of a registered plugin. The plugin goes
    /// back to `Discovered`.
    pub async fn unload(&self, plugin_id: &str) -> AppResult<UnregisterReport> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        let record = self.record(plugin_id).await?;
        self.unload_locked(&record).await
    }

    /// Unloads a plugin if needed and deletes its directory.
    ///
    /// Returns `false` when no repository could delete the directory; the
    /// plugin then stays known as `Discovered`.
    pub async fn delete(&self, plugin_id: &str) -> AppResult<bool> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        let record = self.record(plugin_id).await?;
        if record.state == PluginState::Registered {
            let report = self.unload_locked(&record).await?;
            if !report.is_clean() {
                warn!(plugin_id = %plugin_id, "Plugin unloaded with errors before deletion");
            }
        }

        let repository = Arc::clone(&self.repository);
        let path = record.path.clone();
        let deleted = tokio::task::spawn_blocking(move || repository.delete_path(&path))
            .await
            .map_err(|e| AppError::internal(format!("Plugin deletion task failed: {e}")))?;

        if deleted {
            self.records.write().await.remove(plugin_id);
            info!(plugin_id = %plugin_id, path = %record.path.display(), "Plugin deleted");
        } else {
            warn!(plugin_id = %plugin_id, path = %record.path.display(), "Plugin path could not be deleted");
        }

        Ok(deleted)
    }

    /// Loads every discovered plugin, returning the ids that loaded.
    pub async fn load_all(&self) -> Vec<String> {
        let mut loaded = Vec::new();

        for id in self.ids_in(PluginState::Discovered).await {
            match self.load(&id).await {
                Ok(_) => loaded.push(id),
                Err(e) => error!(plugin_id = %id, error = %e, "Error loading plugin"),
            }
        }

        info!(count = loaded.len(), "Plugins loaded");
        loaded
    }

    /// Unloads every registered plugin, returning the merged report.
    pub async fn unload_all(&self) -> UnregisterReport {
        let mut merged = UnregisterReport::default();

        for id in self.ids_in(PluginState::Registered).await {
            match self.unload(&id).await {
                Ok(report) => merged.merge(report),
                Err(e) => error!(plugin_id = %id, error = %e, "Error unloading plugin"),
            }
        }

        info!("All plugins unloaded");
        merged
    }

    /// Brings the host in line with the plugin roots: discovers, unloads and
    /// forgets registered plugins whose directory is gone, then loads every
    /// plugin found on disk that is not registered yet.
    pub async fn rescan(&self) -> AppResult<RescanReport> {
        let found = self.discover().await?;
        let present: HashSet<&str> = found.iter().map(|r| r.id.as_str()).collect();

        let mut report = RescanReport::default();
        for id in self.ids_in(PluginState::Registered).await {
            if present.contains(id.as_str()) {
                continue;
            }
            match self.forget_vanished(&id).await {
                Ok(true) => report.unloaded.push(id),
                Ok(false) => {}
                Err(e) => warn!(plugin_id = %id, error = %e, "Failed to unload vanished plugin"),
            }
        }

        for record in found {
            if self.state(&record.id).await != PluginState::Discovered {
                continue;
            }
            match self.load(&record.id).await {
                Ok(_) => report.loaded.push(record.id),
                Err(e) => error!(plugin_id = %record.id, error = %e, "Error loading plugin"),
            }
        }

        if !report.loaded.is_empty() || !report.unloaded.is_empty() {
            info!(
                loaded = report.loaded.len(),
                unloaded = report.unloaded.len(),
                "Plugin rescan applied changes"
            );
        }
        Ok(report)
    }

    /// Known plugins, sorted by id.
    pub async fn list(&self) -> Vec<PluginRecord> {
        let mut records: Vec<PluginRecord> = self.records.read().await.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    /// State of a plugin; `Unloaded` if it is unknown.
    pub async fn state(&self, plugin_id: &str) -> PluginState {
        self.records
            .read()
            .await
            .get(plugin_id)
            .map(|r| r.state)
            .unwrap_or(PluginState::Unloaded)
    }

    async fn unload_locked(&self, record: &PluginRecord) -> AppResult<UnregisterReport> {
        let plugin_id = record.id.as_str();
        if record.state != PluginState::Registered {
            return Err(AppError::plugin(format!(
                "Plugin '{plugin_id}' cannot be unloaded while {:?}",
                record.state
            )));
        }

        let mut report = UnregisterReport::default();
        for descriptor in self.descriptors_for(&record.manifest)? {
            match self.registrar.unregister_plugin(plugin_id, &descriptor).await {
                Ok(r) => report.merge(r),
                Err(e) => {
                    error!(
                        plugin_id = %plugin_id,
                        controller = descriptor.type_name(),
                        error = %e,
                        "Failed to unregister controller"
                    );
                    report.failed.push((
                        component_key(plugin_id, descriptor.type_name()),
                        e.message,
                    ));
                }
            }
        }

        self.transition(record, PluginState::Discovered, Vec::new())
            .await;

        info!(
            plugin_id = %plugin_id,
            removed = report.removed.len(),
            failed = report.failed.len(),
            "Plugin unloaded"
        );
        Ok(report)
    }

    /// Unloads a registered plugin that is no longer on disk and drops its
    /// record. Returns `false` if it was reloaded or removed meanwhile.
    async fn forget_vanished(&self, plugin_id: &str) -> AppResult<bool> {
        let lock = self.lock_for(plugin_id);
        let _guard = lock.lock().await;

        let record = self.record(plugin_id).await?;
        if record.state != PluginState::Registered {
            return Ok(false);
        }

        self.unload_locked(&record).await?;
        self.records.write().await.remove(plugin_id);
        Ok(true)
    }

    /// Controller types named by the manifest, or all catalogued ones.
    fn descriptors_for(&self, manifest: &PluginManifest) -> AppResult<Vec<ControllerDescriptor>> {
        let descriptors = if manifest.controllers.is_empty() {
            self.catalog.controllers(&manifest.id)
        } else {
            manifest
                .controllers
                .iter()
                .map(|name| {
                    self.catalog.find(&manifest.id, name).ok_or_else(|| {
                        AppError::plugin(format!(
                            "Plugin '{}' names unknown controller '{name}'",
                            manifest.id
                        ))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?
        };

        if descriptors.is_empty() {
            return Err(AppError::plugin(format!(
                "No controllers are available for plugin '{}'",
                manifest.id
            )));
        }

        Ok(descriptors)
    }

    async fn record(&self, plugin_id: &str) -> AppResult<PluginRecord> {
        self.records
            .read()
            .await
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Plugin '{plugin_id}' not found")))
    }

    async fn transition(
        &self,
        record: &PluginRecord,
        state: PluginState,
        components: Vec<String>,
    ) -> PluginRecord {
        let mut records = self.records.write().await;
        let entry = records
            .entry(record.id.clone())
            .or_insert_with(|| record.clone());
        entry.state = state;
        entry.components = components;
        entry.updated_at = Utc::now();
        entry.clone()
    }

    async fn ids_in(&self, state: PluginState) -> Vec<String> {
        let mut ids: Vec<String> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.state == state)
            .map(|r| r.id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn lock_for(&self, plugin_id: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.locks.entry(plugin_id.to_string()).or_default().value())
    }
}
