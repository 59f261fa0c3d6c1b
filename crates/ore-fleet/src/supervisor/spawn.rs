// ABOUTME: Spawns one mining worker and captures its output for its lifetime.
// ABOUTME: Drains stdout and stderr concurrently into per-worker logs and decodes messages.

use super::logfile::LogFile;
use crate::dispatch::{render, MessageDispatcher};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ore_fleet_core::{decode, FleetError, WorkerSpec};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Mutex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

pub const STDOUT_LOG: &str = "stdout.log";
pub const STDERR_LOG: &str = "stderr.log";
pub const MESSAGES_LOG: &str = "messages.log";

/// Longest line accepted from a worker pipe, excluding the newline.
pub const MAX_LINE_BYTES: usize = 128 * 1024;

/// How a worker process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerExit {
    pub name: String,
    /// None when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl WorkerExit {
    fn new(name: &str, status: ExitStatus) -> Self {
        Self {
            name: name.to_string(),
            code: status.code(),
        }
    }
}

pub struct WorkerSupervisor {
    spec: WorkerSpec,
    log_dir: PathBuf,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

impl WorkerSupervisor {
    /// Logs go to `{log_root}/{name}/`.
    pub fn new(spec: WorkerSpec, log_root: &Path) -> Self {
        let log_dir = log_root.join(&spec.name);
        Self {
            spec,
            log_dir,
            last_activity: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// When the worker last wrote to stdout (or when supervision started).
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_activity.lock().ok().and_then(|guard| *guard)
    }

    /// Run the worker to completion.
    ///
    /// Returns once both output streams hit EOF and the process has exited.
    /// Any I/O failure or protocol violation ends supervision of this worker
    /// with an error; the child is killed when its handle drops.
    pub async fn run(&self, dispatcher: &MessageDispatcher) -> Result<WorkerExit> {
        let name = self.name();

        tokio::fs::create_dir_all(&self.log_dir)
            .await
            .with_context(|| format!("Failed to create log directory {}", self.log_dir.display()))?;

        let mut stdout_log = LogFile::create(&self.log_dir.join(STDOUT_LOG)).await?;
        let mut stderr_log = LogFile::create(&self.log_dir.join(STDERR_LOG)).await?;
        let mut messages_log = LogFile::create(&self.log_dir.join(MESSAGES_LOG)).await?;

        let (program, args) = self
            .spec
            .command
            .split_first()
            .with_context(|| format!("Worker {} has an empty command", name))?;

        self.touch_activity();

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FleetError::Spawn {
                worker: name.to_string(),
                source,
            })?;

        tracing::info!(worker = %name, pid = ?child.id(), "Spawned worker");

        let stdout = child.stdout.take().ok_or_else(|| FleetError::MissingPipe {
            worker: name.to_string(),
            stream: "stdout",
        })?;
        let stderr = child.stderr.take().ok_or_else(|| FleetError::MissingPipe {
            worker: name.to_string(),
            stream: "stderr",
        })?;

        // Both pipes must keep draining: a full stderr buffer would block the
        // child before it ever writes the stdout we are waiting on.
        tokio::try_join!(
            self.drain_stdout(
                BufReader::new(stdout),
                &mut stdout_log,
                &mut messages_log,
                dispatcher
            ),
            self.drain_stderr(BufReader::new(stderr), &mut stderr_log),
        )?;

        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for worker {}", name))?;
        let exit = WorkerExit::new(name, status);

        tracing::info!(worker = %name, code = ?exit.code, "Process {} ended with code {:?}", name, exit.code);
        Ok(exit)
    }

    async fn drain_stdout<R: AsyncBufRead + Unpin>(
        &self,
        mut reader: R,
        stdout_log: &mut LogFile,
        messages_log: &mut LogFile,
        dispatcher: &MessageDispatcher,
    ) -> Result<(), FleetError> {
        let name = self.name();
        let mut buf = Vec::new();

        while let Some(line) = read_line(&mut reader, &mut buf, name, "stdout").await? {
            stdout_log.write_timestamped(&line).await?;
            self.touch_activity();

            let Some(message) = decode(&line) else {
                continue;
            };
            messages_log.write_line(&render(name, &message)).await?;
            dispatcher.route(name, &message)?;
        }

        Ok(())
    }

    async fn drain_stderr<R: AsyncBufRead + Unpin>(
        &self,
        mut reader: R,
        stderr_log: &mut LogFile,
    ) -> Result<(), FleetError> {
        let name = self.name();
        let mut buf = Vec::new();

        while let Some(line) = read_line(&mut reader, &mut buf, name, "stderr").await? {
            stderr_log.write_timestamped(&line).await?;
            tracing::warn!(worker = %name, "{} STDERR: {}", name, line);
        }

        Ok(())
    }

    /// Health hook: records stdout liveness. Nothing alerts on it yet.
    fn touch_activity(&self) {
        if let Ok(mut guard) = self.last_activity.lock() {
            *guard = Some(Utc::now());
        }
    }
}

/// Read one newline-terminated line, trimmed. `None` at EOF.
///
/// A line longer than [`MAX_LINE_BYTES`] is a read error.
async fn read_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    worker: &str,
    stream: &'static str,
) -> Result<Option<String>, FleetError> {
    let read_error = |source: std::io::Error| FleetError::ReadStream {
        worker: worker.to_string(),
        stream,
        source,
    };

    buf.clear();
    let limit = MAX_LINE_BYTES as u64 + 1;
    let n = reader
        .take(limit)
        .read_until(b'\n', buf)
        .await
        .map_err(read_error)?;
    if n == 0 {
        return Ok(None);
    }
    if buf.last() != Some(&b'\n') && n as u64 == limit {
        return Err(read_error(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("line exceeds {} bytes", MAX_LINE_BYTES),
        )));
    }
    Ok(Some(String::from_utf8_lossy(buf).trim().to_string()))
}
