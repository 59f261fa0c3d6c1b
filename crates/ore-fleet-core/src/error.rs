// ABOUTME: Error types for worker supervision using thiserror.
// ABOUTME: Covers log file I/O, pipe reads, spawning, and protocol violations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a single worker's supervision.
#[derive(Error, Debug)]
pub enum FleetError {
    /// A worker reported a landed transaction before it ever reported starting.
    #[error("{worker} landed a transaction without starting")]
    LandedWithoutStart { worker: String },

    /// Failed to create a per-worker log file (including when it already exists).
    #[error("failed to create log file {path}: {source}")]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to append or flush a per-worker log file.
    #[error("failed to write log file {path}: {source}")]
    WriteLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a line from a worker's output pipe.
    #[error("error reading {stream} for {worker}: {source}")]
    ReadStream {
        worker: String,
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Failed to spawn the worker process.
    #[error("failed to spawn worker {worker}: {source}")]
    Spawn {
        worker: String,
        #[source]
        source: std::io::Error,
    },

    /// The child was spawned without one of its piped streams.
    #[error("worker {worker} has no {stream} pipe")]
    MissingPipe {
        worker: String,
        stream: &'static str,
    },
}

/// Result type alias using FleetError.
pub type Result<T> = std::result::Result<T, FleetError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_landed_without_start_display() {
        let err = FleetError::LandedWithoutStart {
            worker: "id_keypair_3".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "id_keypair_3 landed a transaction without starting"
        );
    }

    #[test]
    fn test_create_log_display() {
        let err = FleetError::CreateLog {
            path: PathBuf::from("/logs/w1/stdout.log"),
            source: io::Error::new(io::ErrorKind::AlreadyExists, "file exists"),
        };
        let display = err.to_string();
        assert!(display.contains("failed to create log file"));
        assert!(display.contains("/logs/w1/stdout.log"));
    }

    #[test]
    fn test_read_stream_display() {
        let err = FleetError::ReadStream {
            worker: "w1".to_string(),
            stream: "stderr",
            source: io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        };
        let display = err.to_string();
        assert!(display.contains("error reading stderr for w1"));
    }

    #[test]
    fn test_error_source_write_log() {
        use std::error::Error;

        let err = FleetError::WriteLog {
            path: PathBuf::from("/logs/w1/messages.log"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_no_source_protocol_violation() {
        use std::error::Error;

        let err = FleetError::LandedWithoutStart {
            worker: "w1".to_string(),
        };
        assert!(err.source().is_none());
    }

    #[test]
    fn test_missing_pipe_display() {
        let err = FleetError::MissingPipe {
            worker: "w2".to_string(),
            stream: "stdout",
        };
        assert_eq!(err.to_string(), "worker w2 has no stdout pipe");
    }
}
