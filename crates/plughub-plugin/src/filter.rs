//! Composable path predicates used to select plugin entries on disk.
//!
//! A [`PathFilter`] is a small expression tree: leaf predicates
//! (directory, hidden, extension) combined with `And`, `Or`, and `Not`.
//! Filters are stateless and evaluated against the entry's state at call
//! time, so the same filter can be reused across scans.

use std::path::Path;

/// Extension recognized as a plugin archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// A composable predicate over filesystem entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFilter {
    /// Accepts directories.
    Directory,
    /// Accepts hidden entries (dot-prefixed names, or the OS hidden attribute).
    Hidden,
    /// Accepts entries whose extension matches one of the set, ignoring case.
    Extension(Vec<String>),
    /// Accepts when every inner filter accepts. An empty `And` accepts.
    And(Vec<PathFilter>),
    /// Accepts when any inner filter accepts. An empty `Or` rejects.
    Or(Vec<PathFilter>),
    /// Inverts the inner filter.
    Not(Box<PathFilter>),
}

impl PathFilter {
    /// Directory-only predicate.
    pub fn directory() -> Self {
        Self::Directory
    }

    /// Hidden-entry predicate.
    pub fn hidden() -> Self {
        Self::Hidden
    }

    /// Archive-only predicate (`.zip`, any case).
    pub fn archive() -> Self {
        Self::extension([ARCHIVE_EXTENSION])
    }

    /// Extension predicate. Leading dots are ignored.
    pub fn extension<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Extension(
            extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        )
    }

    /// Conjunction of filters.
    pub fn and(filters: impl IntoIterator<Item = PathFilter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Disjunction of filters.
    pub fn or(filters: impl IntoIterator<Item = PathFilter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// Negation of a filter.
    pub fn not(filter: PathFilter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// The filter applied by plugin repositories: visible directories.
    pub fn plugin_directories() -> Self {
        Self::and([Self::directory(), Self::not(Self::hidden())])
    }

    /// Evaluates the filter against `path`.
    pub fn accept(&self, path: &Path) -> bool {
        match self {
            Self::Directory => path.is_dir(),
            Self::Hidden => is_hidden(path),
            Self::Extension(extensions) => has_extension(path, extensions),
            Self::And(filters) => filters.iter().all(|f| f.accept(path)),
            Self::Or(filters) => filters.iter().any(|f| f.accept(path)),
            Self::Not(filter) => !filter.accept(path),
        }
    }
}

/// Returns `true` if `path` carries a `.zip` extension in any case.
pub fn is_archive_name(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

fn is_hidden(path: &Path) -> bool {
    let dot_prefixed = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));

    dot_prefixed || has_hidden_attribute(path)
}

#[cfg(windows)]
fn has_hidden_attribute(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    std::fs::metadata(path)
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn has_hidden_attribute(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_leaf_predicates() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir.path().join("pluginA");
        let hidden = dir.path().join(".cache");
        let archive = dir.path().join("pluginB.ZIP");
        fs::create_dir(&plugin).unwrap();
        fs::create_dir(&hidden).unwrap();
        fs::write(&archive, b"").unwrap();

        assert!(PathFilter::directory().accept(&plugin));
        assert!(!PathFilter::directory().accept(&archive));
        assert!(PathFilter::hidden().accept(&hidden));
        assert!(!PathFilter::hidden().accept(&plugin));
        assert!(PathFilter::archive().accept(&archive));
        assert!(PathFilter::archive().accept(Path::new("x.Zip")));
        assert!(!PathFilter::archive().accept(Path::new("x.jar")));
        assert!(!PathFilter::archive().accept(Path::new("zip")));
    }

    #[test]
    fn test_composition() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = dir.path().join("pluginA");
        let hidden = dir.path().join(".git");
        fs::create_dir(&plugin).unwrap();
        fs::create_dir(&hidden).unwrap();

        let filter = PathFilter::plugin_directories();
        assert!(filter.accept(&plugin));
        assert!(!filter.accept(&hidden));

        let either = PathFilter::or([PathFilter::archive(), PathFilter::hidden()]);
        assert!(either.accept(&hidden));
        assert!(!either.accept(&plugin));

        assert!(PathFilter::and([]).accept(&plugin));
        assert!(!PathFilter::or([]).accept(&plugin));
        assert!(PathFilter::not(PathFilter::or([])).accept(&plugin));
    }

    #[test]
    fn test_extension_normalizes_input() {
        let filter = PathFilter::extension([".JAR", "zip"]);
        assert_eq!(
            filter,
            PathFilter::Extension(vec!["jar".to_string(), "zip".to_string()])
        );
        assert!(filter.accept(Path::new("lib/plugin.jar")));
        assert!(is_archive_name(Path::new("weather.ZIP")));
    }
}
