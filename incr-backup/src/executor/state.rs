//! Persisted backup state used to compute incremental runs.
//!
//! Serialized as JSON:
//!
//! ```json
//! {
//!   "last_run": "2024-05-01T10:00:00Z",
//!   "files": {
//!     "/home/user/a.txt": { "size": 42, "backed_up": "2024-05-01T10:00:00Z" }
//!   }
//! }
//! ```
//!
//! A missing state file means first run. A file that cannot be read or
//! parsed is an error, never silently reset, so backup history is not lost.

use crate::utils::errors::{BackupError, Result, StateFileError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{error, info};

/// State of one source file at its last successful copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub size: u64,
    pub backed_up: DateTime<Utc>,
}

/// Aggregate state: when the last run finished and what each path looked like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupState {
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,
}

impl BackupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file yields an empty state.
    pub fn load_from(path: &Path) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "state file not found, starting fresh");
                return Ok(Self::new());
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to read state file");
                return Err(BackupError::StateLoad {
                    path: path.to_path_buf(),
                    source: e.into(),
                });
            }
        };

        let state: BackupState = serde_json::from_str(&data).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to parse state file (corrupted)");
            BackupError::StateLoad {
                path: path.to_path_buf(),
                source: e.into(),
            }
        })?;

        info!(path = %path.display(), file_count = state.file_count(), "loaded state from file");
        Ok(state)
    }

    /// Stamp `last_run` and write the state to `path`, creating parent directories.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        self.last_run = Some(Utc::now());

        let save_err = |source: StateFileError| BackupError::StateSave {
            path: path.to_path_buf(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| save_err(e.into()))?;
        }

        let data = serde_json::to_string_pretty(self).map_err(|e| save_err(e.into()))?;
        write_private(path, data.as_bytes()).map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write state file");
            save_err(e.into())
        })?;

        info!(path = %path.display(), file_count = self.file_count(), "saved state to file");
        Ok(())
    }

    pub fn get(&self, path: &Path) -> Option<&FileState> {
        self.files.get(&*path.to_string_lossy())
    }

    /// Record a successful copy of `path` with its size, stamped now.
    pub fn record(&mut self, path: &Path, size: u64) {
        self.files.insert(
            path.to_string_lossy().into_owned(),
            FileState {
                size,
                backed_up: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, path: &Path) -> Option<FileState> {
        self.files.remove(&*path.to_string_lossy())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn total_size(&self) -> u64 {
        self.files.values().map(|f| f.size).sum()
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    fs::write(path, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_state_is_empty() {
        let state = BackupState::new();
        assert!(state.last_run.is_none());
        assert_eq!(state.file_count(), 0);
        assert_eq!(state.total_size(), 0);
    }

    #[test]
    fn test_missing_file_is_first_run() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let state = BackupState::load_from(&temp_dir.path().join("state.json")).unwrap();
        assert_eq!(state, BackupState::new());
        Ok(())
    }

    #[test]
    fn test_corrupted_file_is_an_error() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("state.json");
        fs::write(&path, b"{ not json")?;

        let err = BackupState::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            BackupError::StateLoad { source: StateFileError::Corrupted(_), .. }
        ));
        Ok(())
    }

    #[test]
    fn test_round_trip_preserves_entries() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested/dir/state.json");

        let mut state = BackupState::new();
        state.record(Path::new("/data/a.txt"), 10);
        state.record(Path::new("/data/b.txt"), 0);
        state.record(Path::new("/data/sub/c.bin"), 4096);
        state.save_to(&path).unwrap();

        let loaded = BackupState::load_from(&path).unwrap();
        assert_eq!(loaded.file_count(), 3);
        assert_eq!(loaded.files, state.files);
        assert_eq!(loaded.last_run, state.last_run);
        Ok(())
    }

    #[test]
    fn test_save_updates_last_run_even_when_empty() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("state.json");
        let before = Utc::now();

        let mut state = BackupState::new();
        state.save_to(&path).unwrap();

        let last_run = state.last_run.unwrap();
        assert!(last_run >= before);
        assert_eq!(BackupState::load_from(&path).unwrap().last_run, Some(last_run));
        Ok(())
    }

    #[test]
    fn test_reads_documented_json_layout() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("state.json");
        fs::write(
            &path,
            br#"{
                "last_run": "2024-05-01T10:00:00+02:00",
                "files": {
                    "/home/user/a.txt": { "size": 42, "backed_up": "2024-05-01T08:00:00Z" }
                }
            }"#,
        )?;

        let state = BackupState::load_from(&path).unwrap();
        let entry = state.get(Path::new("/home/user/a.txt")).unwrap();
        assert_eq!(entry.size, 42);
        assert_eq!(state.last_run, Some(entry.backed_up));
        Ok(())
    }

    #[test]
    fn test_record_get_remove() {
        let mut state = BackupState::new();
        let path = Path::new("/data/a.txt");

        state.record(path, 5);
        assert_eq!(state.get(path).map(|f| f.size), Some(5));

        state.record(path, 7);
        assert_eq!(state.file_count(), 1);
        assert_eq!(state.total_size(), 7);

        assert!(state.remove(path).is_some());
        assert!(state.get(path).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn test_unwritable_location_is_a_save_error() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, b"")?;

        let err = BackupState::new().save_to(&blocker.join("state.json")).unwrap_err();
        assert!(matches!(err, BackupError::StateSave { .. }));
        Ok(())
    }
}
