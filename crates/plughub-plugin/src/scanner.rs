//! Filtered listing of a plugin root.
//!
//! Repositories never walk the filesystem themselves; they go through a
//! [`DirectoryScanner`], which lists the direct children of a root that
//! satisfy a [`PathFilter`] and removes entries on request.

use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::filter::PathFilter;

/// Lists and deletes direct children of a root directory.
pub trait DirectoryScanner: Send + Sync + Debug {
    /// Returns the direct children of `root` accepted by `filter`.
    fn list(&self, root: &Path, filter: &PathFilter) -> io::Result<Vec<PathBuf>>;

    /// Removes `path` if `filter` accepts it.
    ///
    /// Returns `false` when the path is rejected by the filter, does not
    /// exist, or could not be removed.
    fn delete(&self, path: &Path, filter: &PathFilter) -> bool;
}

/// [`DirectoryScanner`] backed by `std::fs`.
///
/// Listings are sorted by file name so discovery order does not depend on
/// the host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectoryScanner;

impl FsDirectoryScanner {
    /// Creates a filesystem scanner.
    pub fn new() -> Self {
        Self
    }
}

impl DirectoryScanner for FsDirectoryScanner {
    fn list(&self, root: &Path, filter: &PathFilter) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for entry in std::fs::read_dir(root)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };

            if filter.accept(&path) {
                paths.push(path);
            }
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    fn delete(&self, path: &Path, filter: &PathFilter) -> bool {
        if !filter.accept(path) {
            debug!(path = %path.display(), "Path rejected by filter, not deleting");
            return false;
        }

        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };

        match result {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted plugin path");
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Plugin path already gone");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete plugin path");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_list_is_filtered_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha", ".hidden", "mid"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let paths = FsDirectoryScanner::new()
            .list(dir.path(), &PathFilter::plugin_directories())
            .unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_list_missing_root_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            FsDirectoryScanner::new().list(&dir.path().join("missing"), &PathFilter::directory());
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_respects_filter() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir.path().join("pluginA");
        fs::create_dir_all(plugin.join("lib")).unwrap();
        fs::write(plugin.join("lib/code.bin"), b"x").unwrap();
        let file = dir.path().join("readme.txt");
        fs::write(&file, b"x").unwrap();

        let scanner = FsDirectoryScanner::new();
        let filter = PathFilter::plugin_directories();

        assert!(!scanner.delete(&file, &filter));
        assert!(file.exists());

        assert!(scanner.delete(&plugin, &filter));
        assert!(!plugin.exists());
        assert!(!scanner.delete(&plugin, &filter));
    }
}
