//! Error type for plugin archive handling.
//!
//! Archive failures are scoped to a single bundle: they are logged and
//! reported by the expander, and only mapped into [`AppError`] when a
//! caller asks for a single archive explicitly.

use std::path::PathBuf;

use plughub_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Failure while expanding one plugin archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive file name has no usable stem.
    #[error("Cannot derive a plugin directory name from: {path}")]
    NoBaseName {
        /// The archive path.
        path: PathBuf,
    },

    /// The archive has no parent directory to expand into.
    #[error("Cannot determine parent directory for: {path}")]
    NoParentDir {
        /// The archive path.
        path: PathBuf,
    },

    /// The archive contains too many entries.
    #[error("Archive contains {count} entries, exceeding limit of {limit}")]
    TooManyEntries {
        /// Actual entry count.
        count: usize,
        /// Maximum allowed entries.
        limit: usize,
    },

    /// Extraction exceeded the total size limit.
    #[error("Archive extraction exceeded {limit} byte size limit")]
    SizeExceeded {
        /// Maximum allowed bytes.
        limit: u64,
    },

    /// The archive could not be read as a ZIP file.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Filesystem error while extracting.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ArchiveError> for AppError {
    fn from(err: ArchiveError) -> Self {
        let message = format!("Plugin archive error: {err}");
        AppError::with_source(ErrorKind::Plugin, message, err)
    }
}
