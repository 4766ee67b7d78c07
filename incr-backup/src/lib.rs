//! Incremental Backup Library
//!
//! Scans source trees, detects changed files, copies them under
//! `<backup_root>/<device_id>/<absolute source path>` and records what was
//! copied so the next run only transfers what changed.

pub mod config;
pub mod daemon;
pub mod executor;
pub mod fs;
pub mod sync;
pub mod transfer;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use executor::state::{BackupState, FileState};
pub use executor::{BackupExecutor, BackupJob, BackupResult};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
