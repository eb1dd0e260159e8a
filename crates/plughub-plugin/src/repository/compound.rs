//! Repository composed of several member repositories.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use plughub_core::config::PluginConfig;
use plughub_core::error::AppError;
use plughub_core::result::AppResult;

use crate::archive::ExtractionLimits;

use super::{DefaultPluginRepository, PluginRepository};

/// Ordered union of member repositories.
///
/// Listing merges member listings in registration order and drops paths
/// already seen. Deletion stops at the first member that succeeds.
#[derive(Debug, Default, Clone)]
pub struct CompoundPluginRepository {
    /// Members in registration order.
    repositories: Vec<Arc<dyn PluginRepository>>,
}

impl CompoundPluginRepository {
    /// Creates an empty compound repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the repository described by the plugin configuration: one
    /// member per configured root, plus the development root when running
    /// in development mode.
    pub fn from_config(config: &PluginConfig) -> AppResult<Self> {
        let limits = ExtractionLimits::from(config);

        let mut compound = Self::new();
        for directory in &config.directories {
            compound = compound.add(Arc::new(DefaultPluginRepository::new(directory, limits)));
        }

        if config.mode.is_development() {
            let development = config.development_directory.as_ref().map(|dir| {
                Arc::new(DefaultPluginRepository::new(dir, limits)) as Arc<dyn PluginRepository>
            });
            compound = compound.try_add(development).map_err(|_| {
                AppError::validation(
                    "Development mode requires 'plugins.development_directory' to be set",
                )
            })?;
        }

        Ok(compound)
    }

    /// Appends a member repository.
    pub fn add(mut self, repository: Arc<dyn PluginRepository>) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Appends a member repository that may be absent.
    ///
    /// Fails with a validation error when `repository` is `None`.
    pub fn try_add(self, repository: Option<Arc<dyn PluginRepository>>) -> AppResult<Self> {
        match repository {
            Some(repository) => Ok(self.add(repository)),
            None => Err(AppError::validation("Cannot add an absent plugin repository")),
        }
    }

    /// Appends `repository` only if `condition` holds when called.
    pub fn add_if<F>(self, repository: Arc<dyn PluginRepository>, condition: F) -> Self
    where
        F: FnOnce() -> bool,
    {
        if condition() {
            self.add(repository)
        } else {
            self
        }
    }

    /// Number of member repositories.
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Returns `true` if there are no member repositories.
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}

impl PluginRepository for CompoundPluginRepository {
    fn list_paths(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for repository in &self.repositories {
            for path in repository.list_paths() {
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }

        paths
    }

    fn delete_path(&self, path: &Path) -> bool {
        for (index, repository) in self.repositories.iter().enumerate() {
            if repository.delete_path(path) {
                debug!(path = %path.display(), member = index, "Plugin path deleted");
                return true;
            }
        }

        false
    }
}
