//! Filestore errors

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while projecting ConfigMap data to the filesystem.
///
/// Writes and removals are per-entry and not transactional; both variants
/// carry the paths that were completed before the failing one so callers can
/// report the partial result.
#[derive(Debug, Error)]
pub enum FileStoreError {
    /// Writing a data entry (or creating its parent directory) failed
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// The path that could not be written
        path: PathBuf,
        /// Paths successfully written before the failure
        completed: Vec<PathBuf>,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Removing a data entry's file failed
    #[error("failed to remove {}: {source}", .path.display())]
    Remove {
        /// The path that could not be removed
        path: PathBuf,
        /// Paths successfully removed before the failure
        completed: Vec<PathBuf>,
        /// The underlying I/O error
        source: std::io::Error,
    },
}

impl FileStoreError {
    /// Paths that were successfully processed before the failure.
    pub fn completed(&self) -> &[PathBuf] {
        match self {
            Self::Write { completed, .. } | Self::Remove { completed, .. } => completed,
        }
    }
}
