//! Single-root plugin repository.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::archive::{ArchiveExpander, ExtractionLimits};
use crate::filter::{PathFilter, is_archive_name};
use crate::scanner::{DirectoryScanner, FsDirectoryScanner};

use super::PluginRepository;

/// Repository over the direct children of one plugin root.
///
/// Listing first expands any `.zip` bundle in the root, then returns the
/// visible directories. Deleting a plugin directory also removes its
/// companion archive, if any.
#[derive(Debug, Clone)]
pub struct DefaultPluginRepository {
    /// Root directory scanned by this repository.
    root: PathBuf,
    /// Selects plugin directories among the root's children.
    filter: PathFilter,
    /// Performs the filtered listing and deletion.
    scanner: Arc<dyn DirectoryScanner>,
    /// Expands archives before listing.
    expander: ArchiveExpander,
}

impl DefaultPluginRepository {
    /// Creates a repository over `root` using the filesystem scanner.
    pub fn new(root: impl Into<PathBuf>, limits: ExtractionLimits) -> Self {
        Self::with_scanner(root, limits, Arc::new(FsDirectoryScanner::new()))
    }

    /// Creates a repository with a custom scanner.
    pub fn with_scanner(
        root: impl Into<PathBuf>,
        limits: ExtractionLimits,
        scanner: Arc<dyn DirectoryScanner>,
    ) -> Self {
        Self {
            root: root.into(),
            filter: PathFilter::plugin_directories(),
            scanner,
            expander: ArchiveExpander::new(limits),
        }
    }

    /// Returns the plugin root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
    }

    /// Best-effort removal of `<root>/<name>.zip` (any case) for a plugin
    /// directory `<root>/<name>`. A missing archive is not an error.
    fn delete_companion_archives(&self, plugin_path: &Path) {
        let Some(name) = plugin_path.file_name() else {
            return;
        };

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot scan for companion archives");
                return;
            }
        };

        let companions = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_archive_name(path) && path.file_stem() == Some(name));

        for archive in companions {
            match fs::remove_file(&archive) {
                Ok(()) => info!(archive = %archive.display(), "Deleted companion plugin archive"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    archive = %archive.display(),
                    error = %e,
                    "Failed to delete companion plugin archive"
                ),
            }
        }
    }
}

impl PluginRepository for DefaultPluginRepository {
    fn list_paths(&self) -> Vec<PathBuf> {
        let report = self.expander.expand(&self.root);
        if !report.is_clean() {
            warn!(
                root = %self.root.display(),
                failed = report.failed.len(),
                "Some plugin archives could not be expanded"
            );
        }

        match self.scanner.list(&self.root, &self.filter) {
            Ok(paths) => {
                debug!(root = %self.root.display(), count = paths.len(), "Listed plugin paths");
                paths
            }
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot list plugin root");
                Vec::new()
            }
        }
    }

    fn delete_path(&self, path: &Path) -> bool {
        if !self.owns(path) {
            return false;
        }

        self.delete_companion_archives(path);
        self.scanner.delete(path, &self.filter)
    }
}
