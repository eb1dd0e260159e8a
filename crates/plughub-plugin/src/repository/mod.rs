//! Plugin repositories: where plugin directories come from.
//!
//! A repository yields the plugin directories it currently knows about and
//! can delete one of them. [`DefaultPluginRepository`] scans a single root;
//! [`CompoundPluginRepository`] merges several repositories into one view.

pub mod compound;
pub mod default;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

pub use compound::CompoundPluginRepository;
pub use default::DefaultPluginRepository;

/// Source of plugin directories.
///
/// Implementations perform blocking filesystem work; async callers should
/// run them on a blocking thread.
pub trait PluginRepository: Send + Sync + Debug {
    /// Returns the plugin directories currently available.
    fn list_paths(&self) -> Vec<PathBuf>;

    /// Deletes a plugin directory. Returns `true` if it was removed.
    fn delete_path(&self, path: &Path) -> bool;
}
