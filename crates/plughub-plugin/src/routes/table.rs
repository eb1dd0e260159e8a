//! The shared dispatch table.
//!
//! Every inbound plugin request resolves through this table, so it is
//! read-mostly: lookups take the read lock, while registration and removal
//! take the write lock for the whole batch. A reader therefore sees either
//! none or all of the routes inserted by one registration.

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use super::controller::Controller;
use super::definition::{PathPattern, RouteKey, normalize_path};

/// A route to insert into the table.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    /// Component key of the owning controller instance.
    pub owner: String,
    /// Plugin contributing the route.
    pub plugin_id: String,
    /// Handler identifier within the controller.
    pub handler: String,
    /// Parsed path pattern.
    pub pattern: PathPattern,
    /// Instance serving the route.
    pub controller: Arc<dyn Controller>,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Matched key.
    pub key: RouteKey,
    /// Component key of the owning controller instance.
    pub owner: String,
    /// Plugin contributing the route.
    pub plugin_id: String,
    /// Handler identifier within the controller.
    pub handler: String,
    /// Captured path parameters.
    pub params: HashMap<String, String>,
    /// Instance serving the route.
    pub controller: Arc<dyn Controller>,
}

/// Serializable view of a table entry.
#[derive(Debug, Clone, Serialize)]
pub struct RouteSummary {
    /// Route key.
    #[serde(flatten)]
    pub key: RouteKey,
    /// Pattern as declared.
    pub declared: String,
    /// Owning component key.
    pub owner: String,
    /// Plugin id.
    pub plugin_id: String,
    /// Handler identifier.
    pub handler: String,
}

/// Why a route could not be removed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteRemovalError {
    /// No entry under the key.
    #[error("route is not registered")]
    Absent,
    /// The entry belongs to another component.
    #[error("route is owned by '{0}'")]
    OwnedBy(String),
}

/// Live route table shared by the registrar and the HTTP dispatcher.
#[derive(Debug, Default)]
pub struct DispatchTable {
    /// Route key → entry.
    routes: RwLock<HashMap<RouteKey, RouteEntry>>,
}

impl DispatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a batch of routes under a single write lock.
    ///
    /// Fails with a conflict, inserting nothing, if any key is already
    /// present or repeated within the batch.
    pub async fn insert_all(&self, entries: Vec<(RouteKey, RouteEntry)>) -> AppResult<()> {
        let mut routes = self.routes.write().await;

        let mut batch_keys = std::collections::HashSet::new();
        for (key, entry) in &entries {
            if let Some(existing) = routes.get(key) {
                return Err(AppError::conflict(format!(
                    "Route '{key}' of '{}' is already registered by '{}'",
                    entry.owner, existing.owner
                )));
            }
            if !batch_keys.insert(key) {
                return Err(AppError::conflict(format!(
                    "Route '{key}' is declared twice by '{}'",
                    entry.owner
                )));
            }
        }

        for (key, entry) in entries {
            debug!(route = %key, owner = %entry.owner, "Route registered");
            routes.insert(key, entry);
        }

        Ok(())
    }

    /// Removes the route under `key` if it belongs to `owner`.
    pub async fn remove(&self, key: &RouteKey, owner: &str) -> Result<(), RouteRemovalError> {
        let mut routes = self.routes.write().await;

        match routes.get(key) {
            None => Err(RouteRemovalError::Absent),
            Some(entry) if entry.owner != owner => {
                Err(RouteRemovalError::OwnedBy(entry.owner.clone()))
            }
            Some(_) => {
                routes.remove(key);
                debug!(route = %key, owner = %owner, "Route removed");
                Ok(())
            }
        }
    }

    /// Finds the route serving `method` and `path`.
    ///
    /// Literal routes win over patterns; among patterns the one with the
    /// most literal segments wins.
    pub async fn resolve(&self, method: &Method, path: &str) -> Option<ResolvedRoute> {
        let normalized = normalize_path(path);
        let routes = self.routes.read().await;

        let literal_key = RouteKey {
            method: method.clone(),
            pattern: normalized.clone(),
        };
        if let Some(entry) = routes.get(&literal_key) {
            if entry.pattern.is_static() {
                return Some(resolved(&literal_key, entry, HashMap::new()));
            }
        }

        routes
            .iter()
            .filter(|(key, _)| key.method == *method)
            .filter_map(|(key, entry)| {
                entry
                    .pattern
                    .matches(&normalized)
                    .map(|params| (key, entry, params))
            })
            .max_by(|(ka, a, _), (kb, b, _)| {
                a.pattern
                    .specificity()
                    .cmp(&b.pattern.specificity())
                    .then_with(|| kb.pattern.cmp(&ka.pattern))
            })
            .map(|(key, entry, params)| resolved(key, entry, params))
    }

    /// Keys owned by a component.
    pub async fn routes_of(&self, owner: &str) -> Vec<RouteKey> {
        let routes = self.routes.read().await;
        let mut keys: Vec<RouteKey> = routes
            .iter()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort_by(|a, b| {
            a.pattern
                .cmp(&b.pattern)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });
        keys
    }

    /// Snapshot of all routes, sorted by pattern then method.
    pub async fn list(&self) -> Vec<RouteSummary> {
        let routes = self.routes.read().await;
        let mut summaries: Vec<RouteSummary> = routes
            .iter()
            .map(|(key, entry)| RouteSummary {
                key: key.clone(),
                declared: entry.pattern.as_str().to_string(),
                owner: entry.owner.clone(),
                plugin_id: entry.plugin_id.clone(),
                handler: entry.handler.clone(),
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.key
                .pattern
                .cmp(&b.key.pattern)
                .then_with(|| a.key.method.as_str().cmp(b.key.method.as_str()))
        });
        summaries
    }

    /// Number of routes.
    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Returns `true` if the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }
}

fn resolved(key: &RouteKey, entry: &RouteEntry, params: HashMap<String, String>) -> ResolvedRoute {
    ResolvedRoute {
        key: key.clone(),
        owner: entry.owner.clone(),
        plugin_id: entry.plugin_id.clone(),
        handler: entry.handler.clone(),
        params,
        controller: Arc::clone(&entry.controller),
    }
}
