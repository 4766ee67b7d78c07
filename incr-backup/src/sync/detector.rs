//! Change detection policies.
//!
//! The executor only depends on [`ChangeDetector`], so stronger policies
//! (content hash, mtime) can replace [`SizeDetector`] without touching the
//! pipeline.

use crate::executor::state::FileState;
use crate::fs::metadata::FileMetadata;
use std::path::Path;

/// Decides whether a file must be copied again.
pub trait ChangeDetector: Send + Sync {
    /// `recorded` is `None` when the file has never been backed up.
    fn has_changed(&self, path: &Path, current: &FileMetadata, recorded: Option<&FileState>) -> bool;
}

/// Compares byte counts only.
///
/// Modification time is ignored on purpose: touching a file without
/// changing its length is invisible to this detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeDetector;

impl SizeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeDetector for SizeDetector {
    fn has_changed(&self, _path: &Path, current: &FileMetadata, recorded: Option<&FileState>) -> bool {
        match recorded {
            None => true,
            Some(state) => current.size != state.size,
        }
    }
}
