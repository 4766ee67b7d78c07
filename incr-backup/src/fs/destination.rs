//! Destination layout and validation.
//!
//! Backups land under `<root>/<device_id>/<absolute source path>`. Network
//! destinations are ordinary paths reached through the OS mount namespace;
//! the helpers here only recognise them to give better diagnostics.

use super::walker::clean_path;
use crate::utils::errors::{BackupError, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf, Prefix};

/// Common mount locations for network shares on Unix-like systems.
const NETWORK_MOUNT_PREFIXES: &[&str] = &["/mnt/", "/media/", "/Volumes/"];

const WRITE_PROBE: &str = ".incr_backup_write_test";

/// Build the destination for `source`, nesting its full absolute path under
/// `root/device_id`.
///
/// Root and drive components become plain segments (`C:` is stored as `C`),
/// so files from different volumes never collide. `.` and `..` are resolved
/// first; the result never leaves `root/device_id`.
pub fn destination_path(root: &Path, device_id: &str, source: &Path) -> PathBuf {
    let mut dest = root.join(device_id);

    for component in clean_path(source).components() {
        match component {
            Component::Prefix(prefix) => dest.push(prefix_segment(prefix.kind(), prefix.as_os_str())),
            Component::RootDir | Component::CurDir | Component::ParentDir => {}
            Component::Normal(part) => dest.push(part),
        }
    }

    dest
}

fn prefix_segment(kind: Prefix<'_>, raw: &std::ffi::OsStr) -> OsString {
    match kind {
        Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => {
            OsString::from((letter as char).to_string())
        }
        _ => {
            let cleaned: String = raw
                .to_string_lossy()
                .chars()
                .map(|c| if matches!(c, '\\' | '/' | ':' | '?') { '_' } else { c })
                .collect();
            OsString::from(cleaned.trim_matches('_').to_string())
        }
    }
}

/// Does `path` look like a network location?
pub fn is_network_path(path: &Path) -> bool {
    let raw = path.to_string_lossy();

    if cfg!(windows) {
        return raw.starts_with(r"\\") || raw.starts_with("//");
    }

    NETWORK_MOUNT_PREFIXES.iter().any(|prefix| raw.starts_with(prefix))
}

/// Short description of the path type, for logs
pub fn describe_path_type(path: &Path) -> &'static str {
    if is_network_path(path) {
        if cfg!(windows) {
            "Windows UNC network path"
        } else {
            "network mount point"
        }
    } else {
        "local path"
    }
}

/// Check that the destination root exists, is a directory and accepts writes
pub fn validate_destination(path: &Path) -> Result<()> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let hint = if is_network_path(path) {
                " (is the network drive mounted?)"
            } else {
                ""
            };
            return Err(BackupError::Destination(format!(
                "path does not exist{hint}: {}",
                path.display()
            )));
        }
        Err(e) => {
            return Err(BackupError::Destination(format!(
                "cannot access {}: {e}",
                path.display()
            )))
        }
    };

    if !metadata.is_dir() {
        return Err(BackupError::Destination(format!(
            "path is not a directory: {}",
            path.display()
        )));
    }

    let probe = path.join(WRITE_PROBE);
    fs::write(&probe, b"probe").map_err(|e| {
        BackupError::Destination(format!("path is not writable: {}: {e}", path.display()))
    })?;
    let _ = fs::remove_file(&probe);

    Ok(())
}
