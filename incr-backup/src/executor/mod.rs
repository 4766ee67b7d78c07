//! Backup executor - Orchestrates a single backup run.
//!
//! Ties together:
//! - the source scanner
//! - persisted state lookup
//! - the change detection policy
//! - the copier
//! - state persistence at the end of the run
//!
//! Per-file failures (stat, copy) are counted and skipped; the file keeps its
//! previous state entry and is retried on the next run. Only a scan hard stop
//! or a failed state save aborts the run.

pub mod state;

use crate::fs::destination::destination_path;
use crate::fs::metadata::FileMetadata;
use crate::fs::walker::Scanner;
use crate::sync::detector::ChangeDetector;
use crate::transfer::copier::Copier;
use crate::transfer::progress::{
    bytes_per_second, format_bytes, format_duration, format_speed, RunProgress,
};
use crate::utils::errors::Result;
use state::BackupState;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Backup run configuration
#[derive(Debug, Clone)]
pub struct BackupJob {
    pub paths: Vec<PathBuf>,
    pub destination: PathBuf,
}

/// Backup execution result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupResult {
    pub total_files: usize,
    pub copied_files: usize,
    pub copied_bytes: u64,
    pub skipped_files: usize,
    pub error_files: usize,
    pub duration: Duration,
    /// The run was cancelled before every file was processed
    pub interrupted: bool,
}

impl fmt::Display for BackupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scanned, {} copied ({}), {} unchanged, {} errors in {} ({})",
            self.total_files,
            self.copied_files,
            format_bytes(self.copied_bytes),
            self.skipped_files,
            self.error_files,
            format_duration(self.duration.as_secs()),
            format_speed(bytes_per_second(self.copied_bytes, self.duration)),
        )?;
        if self.interrupted {
            write!(f, ", interrupted")?;
        }
        Ok(())
    }
}

enum FileOutcome {
    Copied(u64),
    Unchanged,
    Failed,
}

/// Main backup executor
pub struct BackupExecutor {
    scanner: Scanner,
    detector: Box<dyn ChangeDetector>,
    copier: Box<dyn Copier>,
    state: BackupState,
    state_path: PathBuf,
    device_id: String,
    cancel_token: CancellationToken,
}

impl BackupExecutor {
    /// Create a new backup executor (no cancellation support)
    pub fn new(
        scanner: Scanner,
        detector: Box<dyn ChangeDetector>,
        copier: Box<dyn Copier>,
        state: BackupState,
        state_path: PathBuf,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            scanner,
            detector,
            copier,
            state,
            state_path,
            device_id: device_id.into(),
            cancel_token: CancellationToken::new(),
        }
    }

    /// Stop the per-file loop when `cancel_token` is cancelled.
    ///
    /// The scanner carries its own token; build it with
    /// [`Scanner::with_cancel`] to make scanning cancellable too.
    pub fn with_cancel(mut self, cancel_token: CancellationToken) -> Self {
        self.cancel_token = cancel_token;
        self
    }

    pub fn state(&self) -> &BackupState {
        &self.state
    }

    /// Execute a backup job
    pub fn execute(&mut self, job: &BackupJob) -> Result<BackupResult> {
        info!(
            paths = ?job.paths,
            destination = %job.destination.display(),
            device_id = %self.device_id,
            "starting backup"
        );

        info!("scanning files...");
        let files = self.scanner.scan(job.paths.as_slice())?;
        info!(file_count = files.len(), "scan complete");

        let mut progress = RunProgress::new(files.len());
        let mut result = BackupResult {
            total_files: files.len(),
            ..BackupResult::default()
        };

        for file in &files {
            if self.cancel_token.is_cancelled() {
                warn!(
                    processed = progress.files_processed(),
                    remaining = files.len() - progress.files_processed(),
                    "backup cancelled, saving state for completed files"
                );
                result.interrupted = true;
                break;
            }

            match self.process_file(&file.path, &job.destination) {
                FileOutcome::Copied(bytes) => {
                    result.copied_files += 1;
                    result.copied_bytes += bytes;
                    progress.file_done(bytes);
                }
                FileOutcome::Unchanged => {
                    result.skipped_files += 1;
                    progress.file_done(0);
                }
                FileOutcome::Failed => {
                    result.error_files += 1;
                    progress.file_done(0);
                }
            }
        }

        if let Err(e) = self.copier.close() {
            warn!(error = %e, "failed to close copier");
        }

        info!("saving state...");
        self.state.save_to(&self.state_path)?;

        result.duration = progress.elapsed();
        info!(
            total_files = result.total_files,
            copied = result.copied_files,
            skipped = result.skipped_files,
            errors = result.error_files,
            bytes = result.copied_bytes,
            "backup complete"
        );

        Ok(result)
    }

    fn process_file(&mut self, path: &Path, destination_root: &Path) -> FileOutcome {
        // Fresh stat: the file may have changed or vanished since the scan.
        let current = match FileMetadata::from_path(path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to stat file");
                return FileOutcome::Failed;
            }
        };

        let recorded = self.state.get(path);
        if !self.detector.has_changed(path, &current, recorded) {
            debug!(path = %path.display(), "file unchanged, skipping");
            return FileOutcome::Unchanged;
        }

        let dest = destination_path(destination_root, &self.device_id, path);
        match self.copier.copy(path, &dest) {
            Ok(bytes) => {
                self.state.record(path, current.size);
                FileOutcome::Copied(bytes)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to copy file");
                FileOutcome::Failed
            }
        }
    }
}
