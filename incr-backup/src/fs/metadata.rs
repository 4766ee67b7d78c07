//! Fresh per-file metadata taken right before a copy decision.
//!
//! The scan and the copy loop are separated in time, so the executor stats
//! every file again instead of trusting the size recorded by the scanner.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

/// Current metadata of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// File size in bytes
    pub size: u64,

    /// Last modified time, when the platform reports one
    pub modified: Option<DateTime<Utc>>,

    /// Is this a directory?
    pub is_dir: bool,
}

impl FileMetadata {
    /// Stat a file, following symlinks
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;

        Ok(Self {
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_dir: metadata.is_dir(),
        })
    }

    /// Metadata for a file of `size` bytes
    #[cfg(test)]
    pub(crate) fn with_size(size: u64) -> Self {
        Self {
            size,
            modified: None,
            is_dir: false,
        }
    }
}
