//! Run progress accounting and human-readable formatting.

use std::time::{Duration, Instant};
use tracing::info;

/// How often (in processed files) a progress line is logged.
const LOG_EVERY_FILES: usize = 500;

/// Progress of a single backup run
#[derive(Debug)]
pub struct RunProgress {
    start_time: Instant,
    total_files: usize,
    files_processed: usize,
    copied_bytes: u64,
}

impl RunProgress {
    pub fn new(total_files: usize) -> Self {
        Self {
            start_time: Instant::now(),
            total_files,
            files_processed: 0,
            copied_bytes: 0,
        }
    }

    /// Record one processed file (copied, skipped or failed)
    pub fn file_done(&mut self, copied_bytes: u64) {
        self.files_processed += 1;
        self.copied_bytes += copied_bytes;

        if self.files_processed % LOG_EVERY_FILES == 0 {
            info!(
                processed = self.files_processed,
                total = self.total_files,
                percent = %format!("{:.1}", self.percent_complete()),
                copied = %format_bytes(self.copied_bytes),
                speed = %format_speed(self.average_speed()),
                "backup progress"
            );
        }
    }

    pub fn files_processed(&self) -> usize {
        self.files_processed
    }

    pub fn copied_bytes(&self) -> u64 {
        self.copied_bytes
    }

    pub fn percent_complete(&self) -> f64 {
        if self.total_files > 0 {
            (self.files_processed as f64 / self.total_files as f64 * 100.0).min(100.0)
        } else {
            100.0
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average copy speed since start, in bytes/second
    pub fn average_speed(&self) -> u64 {
        bytes_per_second(self.copied_bytes, self.elapsed())
    }
}

pub fn bytes_per_second(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Format speed as human-readable string
pub fn format_speed(bytes_per_second: u64) -> String {
    format!("{}/s", format_bytes(bytes_per_second))
}

/// Format duration as human-readable string
pub fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_progress_counts() {
        let mut progress = RunProgress::new(4);
        progress.file_done(100);
        progress.file_done(0);
        progress.file_done(28);

        assert_eq!(progress.files_processed(), 3);
        assert_eq!(progress.copied_bytes(), 128);
        assert!((progress.percent_complete() - 75.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_run_is_complete() {
        let progress = RunProgress::new(0);
        assert!((progress.percent_complete() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_bytes_per_second() {
        assert_eq!(bytes_per_second(2048, Duration::from_secs(2)), 1024);
        assert_eq!(bytes_per_second(2048, Duration::ZERO), 0);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(1024), "1.00 KB/s");
        assert_eq!(format_speed(1024 * 1024), "1.00 MB/s");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(30), "30s");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3665), "1h 1m");
    }
}
