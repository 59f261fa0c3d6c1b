// ABOUTME: Append-only per-worker log file, created fresh for each run.
// ABOUTME: Every entry is written and flushed before the next line is read.

use ore_fleet_core::FleetError;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Local ISO-8601 timestamp prefixed to stdout and stderr entries.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub struct LogFile {
    path: PathBuf,
    file: File,
}

impl LogFile {
    /// Create `path`, failing if it already exists.
    pub async fn create(path: &Path) -> Result<Self, FleetError> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|source| FleetError::CreateLog {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `line` plus a newline and flush.
    pub async fn write_line(&mut self, line: &str) -> Result<(), FleetError> {
        let mut entry = String::with_capacity(line.len() + 1);
        entry.push_str(line);
        entry.push('\n');
        self.write_entry(entry.as_bytes()).await
    }

    /// Append `line` prefixed with the current local time.
    pub async fn write_timestamped(&mut self, line: &str) -> Result<(), FleetError> {
        let stamp = chrono::Local::now().format(TIMESTAMP_FORMAT);
        self.write_entry(format!("{} {}\n", stamp, line).as_bytes())
            .await
    }

    async fn write_entry(&mut self, bytes: &[u8]) -> Result<(), FleetError> {
        let result = async {
            self.file.write_all(bytes).await?;
            self.file.flush().await
        }
        .await;
        result.map_err(|source| FleetError::WriteLog {
            path: self.path.clone(),
            source,
        })
    }
}
