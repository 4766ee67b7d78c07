//! File transport to the destination.

use crate::utils::errors::CopyError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Transfers one file's bytes from `src` to `dst`.
pub trait Copier: Send {
    /// Copy `src` to `dst`, creating missing parent directories.
    /// Returns the number of bytes written.
    fn copy(&mut self, src: &Path, dst: &Path) -> Result<u64, CopyError>;

    /// Release any held connection. Called once at the end of a run.
    fn close(&mut self) -> Result<(), CopyError> {
        Ok(())
    }
}

/// Copies onto a locally reachable filesystem (including mounted shares)
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalCopier;

impl LocalCopier {
    pub fn new() -> Self {
        Self
    }
}

impl Copier for LocalCopier {
    fn copy(&mut self, src: &Path, dst: &Path) -> Result<u64, CopyError> {
        debug!(src = %src.display(), dst = %dst.display(), "copying file");

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|source| CopyError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let src_file = File::open(src).map_err(|source| CopyError::OpenSource {
            path: src.to_path_buf(),
            source,
        })?;

        let dst_file = File::create(dst).map_err(|source| CopyError::CreateDestination {
            path: dst.to_path_buf(),
            source,
        })?;

        // Both handles are dropped on every return path below.
        let mut reader = BufReader::new(src_file);
        let mut writer = BufWriter::new(dst_file);
        let bytes = io::copy(&mut reader, &mut writer)
            .and_then(|n| writer.flush().map(|_| n))
            .map_err(|source| CopyError::Stream {
                path: dst.to_path_buf(),
                source,
            })?;

        info!(src = %src.display(), dst = %dst.display(), bytes, "copied file");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_file() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&src, b"hello backup")?;

        let bytes = LocalCopier::new().copy(&src, &dst).unwrap();

        assert_eq!(bytes, 12);
        assert_eq!(fs::read(&dst)?, b"hello backup");
        Ok(())
    }

    #[test]
    fn test_creates_destination_directories() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("backup/device/deep/nested/src.txt");
        fs::write(&src, b"x")?;

        LocalCopier::new().copy(&src, &dst).unwrap();

        assert!(dst.exists());
        Ok(())
    }

    #[test]
    fn test_overwrites_existing_destination() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&dst, b"an older and longer version")?;
        fs::write(&src, b"new")?;

        LocalCopier::new().copy(&src, &dst).unwrap();

        assert_eq!(fs::read(&dst)?, b"new");
        Ok(())
    }

    #[test]
    fn test_missing_source_reports_open_step() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let err = LocalCopier::new()
            .copy(&temp_dir.path().join("missing.txt"), &temp_dir.path().join("out.txt"))
            .unwrap_err();

        assert!(matches!(err, CopyError::OpenSource { .. }));
        assert!(!temp_dir.path().join("out.txt").exists());
        Ok(())
    }

    #[test]
    fn test_blocked_parent_reports_create_dir_step() -> std::io::Result<()> {
        let temp_dir = TempDir::new()?;
        let src = temp_dir.path().join("src.txt");
        fs::write(&src, b"x")?;
        // A regular file where a directory is needed.
        fs::write(temp_dir.path().join("blocker"), b"")?;

        let err = LocalCopier::new()
            .copy(&src, &temp_dir.path().join("blocker/child/out.txt"))
            .unwrap_err();

        assert!(matches!(err, CopyError::CreateDir { .. }));
        Ok(())
    }

    #[test]
    fn test_close_is_a_no_op() {
        assert!(LocalCopier::new().close().is_ok());
    }
}
