//! Registry of live controller instances.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use super::controller::Controller;

/// Key under which a plugin's controller instance is registered.
pub fn component_key(plugin_id: &str, type_name: &str) -> String {
    format!("{plugin_id}_{type_name}")
}

/// Live controller instances, keyed by [`component_key`].
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    /// Component key → instance.
    components: RwLock<HashMap<String, Arc<dyn Controller>>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an instance. Fails with a conflict if the key is taken.
    pub async fn register(&self, key: &str, instance: Arc<dyn Controller>) -> AppResult<()> {
        let mut components = self.components.write().await;

        if components.contains_key(key) {
            return Err(AppError::conflict(format!(
                "Component '{key}' is already registered"
            )));
        }

        components.insert(key.to_string(), instance);
        debug!(component = %key, "Component registered");
        Ok(())
    }

    /// Removes and returns an instance.
    pub async fn remove(&self, key: &str) -> Option<Arc<dyn Controller>> {
        let removed = self.components.write().await.remove(key);
        if removed.is_some() {
            debug!(component = %key, "Component removed");
        }
        removed
    }

    /// Gets an instance.
    pub async fn get(&self, key: &str) -> Option<Arc<dyn Controller>> {
        self.components.read().await.get(key).cloned()
    }

    /// Checks whether a key is registered.
    pub async fn contains(&self, key: &str) -> bool {
        self.components.read().await.contains_key(key)
    }

    /// Registered keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.components.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of registered instances.
    pub async fn len(&self) -> usize {
        self.components.read().await.len()
    }

    /// Returns `true` if nothing is registered.
    pub async fn is_empty(&self) -> bool {
        self.components.read().await.is_empty()
    }
}
