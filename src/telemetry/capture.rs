//! # Raw Capture
//!
//! Mirrors the raw session text to a file as it arrives, so a flight can be
//! replayed later through the same pipeline.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::Result;

/// Build the capture file name for a session start time,
/// e.g. `2024_06_12-10_30_15_Log.txt`.
#[must_use]
pub fn capture_file_name(started: &DateTime<Local>) -> String {
    started.format("%Y_%m_%d-%H_%M_%S_Log.txt").to_string()
}

/// Append-only raw text capture.
#[derive(Debug)]
pub struct RawCapture {
    file: File,
    path: PathBuf,
    bytes_written: u64,
}

impl RawCapture {
    /// Create a new capture file in `dir`, named after the current local time.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created.
    pub async fn create_in<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        Self::open(dir.join(capture_file_name(&Local::now()))).await
    }

    /// Open (or create) a capture file at an explicit path, appending to it.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!("Capturing raw telemetry to {}", path.display());
        Ok(Self {
            file,
            path,
            bytes_written: 0,
        })
    }

    /// Append a chunk exactly as received.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    pub async fn append(&mut self, chunk: &[u8]) -> Result<()> {
        self.file.write_all(chunk).await?;
        self.bytes_written += chunk.len() as u64;
        Ok(())
    }

    /// Flush buffered data to disk.
    ///
    /// # Errors
    ///
    /// Returns error if the flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.file.flush().await?;
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_capture_file_name() {
        let started = Local.with_ymd_and_hms(2024, 6, 12, 10, 30, 15).unwrap();
        assert_eq!(capture_file_name(&started), "2024_06_12-10_30_15_Log.txt");
    }

    #[tokio::test]
    async fn test_append_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flight.txt");

        let mut capture = RawCapture::open(&path).await.unwrap();
        capture.append(b"I 1 100\nT=2").await.unwrap();
        capture.append(b"0\n").await.unwrap();
        capture.flush().await.unwrap();

        assert_eq!(capture.bytes_written(), 13);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "I 1 100\nT=20\n");
    }

    #[tokio::test]
    async fn test_create_in_makes_directory() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs");

        let capture = RawCapture::create_in(&logs).await.unwrap();
        assert!(capture.path().starts_with(&logs));
        assert!(capture.path().to_string_lossy().ends_with("_Log.txt"));
        assert!(capture.path().exists());
    }
}
