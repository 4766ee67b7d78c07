//! Recursive source scanner.
//!
//! Walks every configured root, resolving symlinks once and guarding against
//! cycles with a visited set shared by the whole scan. Ignore patterns are
//! applied in the same pass so an ignored directory is never descended into.
//! Per-path errors (permission denied, broken links, unreadable directories)
//! are logged and skipped; only cancellation aborts a scan.

use super::pattern::PatternMatcher;
use crate::utils::errors::ScanError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Number of files listed by a dry run before summarising the rest.
const DRY_RUN_SAMPLE: usize = 10;

/// A regular file discovered during a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Absolute path (the resolved target for symlinks)
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Last modification time, informational only
    pub modified: Option<DateTime<Utc>>,

    /// Always false; directories are never emitted
    pub is_dir: bool,
}

/// Source tree scanner
#[derive(Debug, Clone)]
pub struct Scanner {
    matcher: PatternMatcher,
    cancel_token: CancellationToken,
}

impl Scanner {
    /// Create a scanner with the given ignore patterns (no cancellation support)
    pub fn new<S: AsRef<str>>(ignore_patterns: &[S]) -> Self {
        Self::with_cancel(ignore_patterns, CancellationToken::new())
    }

    /// Create a scanner that stops when `cancel_token` is cancelled
    pub fn with_cancel<S: AsRef<str>>(ignore_patterns: &[S], cancel_token: CancellationToken) -> Self {
        Self {
            matcher: PatternMatcher::new(ignore_patterns),
            cancel_token,
        }
    }

    /// Scan all roots and collect the regular files found
    ///
    /// # Returns
    /// * `Ok(Vec<FileDescriptor>)` - Files in traversal order
    /// * `Err(ScanError::Cancelled)` - If the scan was cancelled
    ///
    /// # Example
    /// ```no_run
    /// use incr_backup::fs::walker::Scanner;
    /// use std::path::PathBuf;
    ///
    /// let scanner = Scanner::new(&["*.tmp", ".cache/*"]);
    /// let files = scanner.scan(&[PathBuf::from("/home/user/docs")]).unwrap();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<FileDescriptor>, ScanError> {
        let mut files = Vec::new();
        self.scan_with_callback(roots, |file| files.push(file))?;
        Ok(files)
    }

    /// Scan all roots, handing each file to `callback` as it is found
    pub fn scan_with_callback<P, F>(&self, roots: &[P], mut callback: F) -> Result<(), ScanError>
    where
        P: AsRef<Path>,
        F: FnMut(FileDescriptor),
    {
        let mut seen = HashSet::new();

        for root in roots {
            self.scan_path(root.as_ref(), &mut seen, &mut callback)?;
        }

        Ok(())
    }

    /// Scan and log what a backup would process, without touching state or destination
    pub fn scan_dry_run<P: AsRef<Path>>(&self, roots: &[P]) -> Result<Vec<FileDescriptor>, ScanError> {
        let files = self.scan(roots)?;

        info!(file_count = files.len(), "dry-run scan complete");
        for file in files.iter().take(DRY_RUN_SAMPLE) {
            info!(path = %file.path.display(), size = file.size, "would back up");
        }
        if files.len() > DRY_RUN_SAMPLE {
            info!(additional_files = files.len() - DRY_RUN_SAMPLE, "...");
        }

        Ok(files)
    }

    fn scan_path<F>(
        &self,
        path: &Path,
        seen: &mut HashSet<PathBuf>,
        callback: &mut F,
    ) -> Result<(), ScanError>
    where
        F: FnMut(FileDescriptor),
    {
        if self.cancel_token.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let abs_path = match std::path::absolute(path) {
            Ok(p) => clean_path(&p),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to get absolute path");
                return Ok(());
            }
        };

        // Keyed by the canonical path so that a link back to an ancestor, or a
        // second link to the same target, is recognised as already visited.
        let visit_key = fs::canonicalize(&abs_path).unwrap_or_else(|_| abs_path.clone());
        if !seen.insert(visit_key) {
            debug!(path = %abs_path.display(), "skipping already visited path");
            return Ok(());
        }

        let metadata = match fs::symlink_metadata(&abs_path) {
            Ok(m) => m,
            Err(e) => {
                log_stat_error(&abs_path, &e);
                return Ok(());
            }
        };

        let (path, metadata) = if metadata.file_type().is_symlink() {
            let target = match fs::canonicalize(&abs_path) {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %abs_path.display(), error = %e, "failed to resolve symlink");
                    return Ok(());
                }
            };
            match fs::metadata(&target) {
                Ok(m) => (target, m),
                Err(e) => {
                    warn!(path = %target.display(), error = %e, "failed to stat symlink target");
                    return Ok(());
                }
            }
        } else {
            (abs_path, metadata)
        };

        if let Some(pattern) = self.matcher.find_match(&path) {
            debug!(path = %path.display(), pattern = pattern.as_str(), "ignoring path");
            return Ok(());
        }

        if metadata.is_dir() {
            let entries = match fs::read_dir(&path) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    warn!(path = %path.display(), error = %e, "permission denied reading directory");
                    return Ok(());
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to read directory");
                    return Ok(());
                }
            };

            for entry in entries {
                match entry {
                    Ok(entry) => self.scan_path(&path.join(entry.file_name()), seen, callback)?,
                    Err(e) => warn!(path = %path.display(), error = %e, "failed to read directory entry"),
                }
            }
        } else if metadata.is_file() {
            callback(FileDescriptor {
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
                size: metadata.len(),
                path,
                is_dir: false,
            });
        } else {
            debug!(path = %path.display(), "skipping special file");
        }

        Ok(())
    }
}

/// Lexically resolve `.` and `..` components.
///
/// `..` removes the preceding segment and is dropped at the root, so
/// `/a/../../b` becomes `/b`. Symlinks are not consulted.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

fn log_stat_error(path: &Path, e: &io::Error) {
    if e.kind() == io::ErrorKind::PermissionDenied {
        warn!(path = %path.display(), error = %e, "permission denied");
    } else {
        error!(path = %path.display(), error = %e, "failed to stat file");
    }
}
