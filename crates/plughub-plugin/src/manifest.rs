//! Optional `plugin.json` manifest inside a plugin directory.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use plughub_core::error::{AppError, ErrorKind};
use plughub_core::result::AppResult;

/// File name of the manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.json";

/// Plugin metadata.
///
/// ```json
/// {
///   "id": "weather",
///   "name": "Weather",
///   "version": "1.0.0",
///   "controllers": ["WeatherController"]
/// }
/// ```
///
/// An empty `controllers` list means every controller the catalog holds
/// for the plugin id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginManifest {
    /// Plugin id. Defaults to the directory name.
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Version string.
    pub version: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Controller type names to register.
    pub controllers: Vec<String>,
}

impl PluginManifest {
    /// Reads the manifest of `dir`, returning `None` when there is none.
    pub fn load(dir: &Path) -> AppResult<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Plugin,
                    format!("Cannot read manifest '{}'", path.display()),
                    e,
                ));
            }
        };

        let mut manifest: Self = serde_json::from_str(&raw).map_err(|e| {
            AppError::with_source(
                ErrorKind::Plugin,
                format!("Invalid manifest '{}': {e}", path.display()),
                e,
            )
        })?;

        if manifest.id.trim().is_empty() {
            manifest.id = directory_id(dir)?;
        }

        Ok(Some(manifest))
    }

    /// Reads the manifest of `dir`, falling back to one derived from the
    /// directory name.
    pub fn resolve(dir: &Path) -> AppResult<Self> {
        match Self::load(dir)? {
            Some(manifest) => Ok(manifest),
            None => Ok(Self {
                id: directory_id(dir)?,
                ..Self::default()
            }),
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn directory_id(dir: &Path) -> AppResult<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::plugin(format!(
                "Cannot derive a plugin id from '{}'",
                dir.display()
            ))
        })
}
