//! Custom error types for the backup pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to read state file {}: {source}", path.display())]
    StateLoad {
        path: PathBuf,
        #[source]
        source: StateFileError,
    },

    #[error("failed to write state file {}: {source}", path.display())]
    StateSave {
        path: PathBuf,
        #[source]
        source: StateFileError,
    },

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Destination error: {0}")]
    Destination(String),

    #[error("could not determine the home directory")]
    HomeDirUnavailable,
}

/// Underlying cause of a state file failure.
#[derive(Error, Debug)]
pub enum StateFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("corrupted state file: {0}")]
    Corrupted(#[from] serde_json::Error),
}

/// Conditions that abort an entire scan. Per-path problems never surface here.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scan cancelled")]
    Cancelled,
}

/// A single-file copy failure, tagged with the step that failed.
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("failed to create destination directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open source file {}: {source}", path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to create destination file {}: {source}", path.display())]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy file contents to {}: {source}", path.display())]
    Stream {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, BackupError>;
