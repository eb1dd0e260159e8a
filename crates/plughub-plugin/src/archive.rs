//! Expansion of plugin `.zip` bundles into sibling directories.
//!
//! Each archive `<root>/<name>.zip` expands into `<root>/<name>/`. An
//! archive is only expanded when that directory is missing or older than
//! the archive. Extraction happens in a hidden staging directory that
//! replaces the target only once every entry has been written, so a failed
//! or partial extraction never touches an existing plugin directory.
//!
//! Archives are processed independently: one failure is logged and reported
//! without affecting the others.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zip::ZipArchive;

use plughub_core::config::PluginConfig;

use crate::error::ArchiveError;
use crate::filter::PathFilter;

/// Upper bounds enforced while extracting an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionLimits {
    /// Maximum number of entries in one archive.
    pub max_entries: usize,
    /// Maximum total uncompressed size of one archive, in bytes.
    pub max_bytes: u64,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_bytes: 1024 * 1024 * 1024,
        }
    }
}

impl From<&PluginConfig> for ExtractionLimits {
    fn from(config: &PluginConfig) -> Self {
        Self {
            max_entries: config.max_archive_entries,
            max_bytes: config.max_extracted_bytes,
        }
    }
}

/// Result of expanding a single archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpandOutcome {
    /// The archive was extracted into the returned directory.
    Expanded(PathBuf),
    /// The directory was already at least as new as the archive.
    UpToDate(PathBuf),
}

/// Summary of one [`ArchiveExpander::expand`] pass over a root.
#[derive(Debug, Default)]
pub struct ExpansionReport {
    /// Directories produced by this pass.
    pub expanded: Vec<PathBuf>,
    /// Directories left untouched because they were up to date.
    pub skipped: Vec<PathBuf>,
    /// Archives that failed, with the failure message.
    pub failed: Vec<(PathBuf, String)>,
}

impl ExpansionReport {
    /// Returns `true` if no archive failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Expands plugin archives found directly under a plugin root.
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    /// Selects archive entries.
    filter: PathFilter,
    /// Extraction limits.
    limits: ExtractionLimits,
}

impl ArchiveExpander {
    /// Creates an expander with the given limits.
    pub fn new(limits: ExtractionLimits) -> Self {
        Self {
            filter: PathFilter::archive(),
            limits,
        }
    }

    /// Expands every archive directly under `root`.
    ///
    /// Never fails as a whole: an unreadable root yields an empty report and
    /// per-archive failures are collected in [`ExpansionReport::failed`].
    pub fn expand(&self, root: &Path) -> ExpansionReport {
        let mut report = ExpansionReport::default();

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot scan plugin root for archives");
                return report;
            }
        };

        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && self.filter.accept(path))
            .collect();
        archives.sort();

        for archive in archives {
            match self.expand_archive(&archive) {
                Ok(ExpandOutcome::Expanded(dir)) => report.expanded.push(dir),
                Ok(ExpandOutcome::UpToDate(dir)) => report.skipped.push(dir),
                Err(e) => {
                    error!(
                        archive = %archive.display(),
                        error = %e,
                        "Cannot expand plugin archive"
                    );
                    report.failed.push((archive, e.to_string()));
                }
            }
        }

        report
    }

    /// Expands a single archive into its sibling directory.
    pub fn expand_archive(&self, archive: &Path) -> Result<ExpandOutcome, ArchiveError> {
        let target = target_directory(archive)?;

        if is_up_to_date(archive, &target)? {
            debug!(
                archive = %archive.display(),
                directory = %target.display(),
                "Plugin archive already expanded"
            );
            return Ok(ExpandOutcome::UpToDate(target));
        }

        let staging = staging_directory(&target)?;

        if let Err(e) = self.extract_into(archive, &staging) {
            discard(&staging);
            return Err(e);
        }

        if let Err(e) = replace_directory(&staging, &target) {
            discard(&staging);
            return Err(e.into());
        }

        info!(
            archive = %archive.display(),
            directory = %target.display(),
            "Expanded plugin archive"
        );

        Ok(ExpandOutcome::Expanded(target))
    }

    /// Writes every entry of `archive` below `destination`.
    fn extract_into(&self, archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
        let file = File::open(archive)?;
        let mut zip = ZipArchive::new(file)?;

        if zip.len() > self.limits.max_entries {
            return Err(ArchiveError::TooManyEntries {
                count: zip.len(),
                limit: self.limits.max_entries,
            });
        }

        fs::create_dir_all(destination)?;

        let mut total_size = 0u64;

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;

            let enclosed_name = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!(
                        archive = %archive.display(),
                        entry = %entry.name(),
                        "Skipping archive entry outside the plugin directory"
                    );
                    continue;
                }
            };

            let out_path = destination.join(&enclosed_name);

            if entry.is_dir() {
                fs::create_dir_all(&out_path)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut outfile = File::create(&out_path)?;

                // Count what is actually inflated; declared sizes can lie.
                let remaining = self.limits.max_bytes.saturating_sub(total_size);
                let written =
                    io::copy(&mut (&mut entry).take(remaining.saturating_add(1)), &mut outfile)?;
                total_size = total_size.saturating_add(written);
                if total_size > self.limits.max_bytes {
                    return Err(ArchiveError::SizeExceeded {
                        limit: self.limits.max_bytes,
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for ArchiveExpander {
    fn default() -> Self {
        Self::new(ExtractionLimits::default())
    }
}

/// `<parent>/<stem>` for `<parent>/<stem>.zip`.
fn target_directory(archive: &Path) -> Result<PathBuf, ArchiveError> {
    let parent = archive.parent().ok_or_else(|| ArchiveError::NoParentDir {
        path: archive.to_path_buf(),
    })?;

    let stem = archive
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ArchiveError::NoBaseName {
            path: archive.to_path_buf(),
        })?;

    Ok(parent.join(stem))
}

fn is_up_to_date(archive: &Path, target: &Path) -> Result<bool, ArchiveError> {
    let target_meta = match fs::metadata(target) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };

    if !target_meta.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' exists and is not a directory", target.display()),
        )
        .into());
    }

    let archive_modified = fs::metadata(archive)?.modified()?;
    let target_modified = target_meta.modified()?;

    Ok(archive_modified <= target_modified)
}

/// Hidden sibling of `target`, so it is never picked up by discovery.
fn staging_directory(target: &Path) -> Result<PathBuf, ArchiveError> {
    let parent = target.parent().ok_or_else(|| ArchiveError::NoParentDir {
        path: target.to_path_buf(),
    })?;
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(parent.join(format!(".{}.expanding-{}", name, Uuid::now_v7().simple())))
}

fn replace_directory(staging: &Path, target: &Path) -> io::Result<()> {
    if target.exists() {
        fs::remove_dir_all(target)?;
    }
    fs::rename(staging, target)
}

fn discard(staging: &Path) {
    if let Err(e) = fs::remove_dir_all(staging) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
        }
    }
}
