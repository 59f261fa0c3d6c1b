// ABOUTME: Shared logging setup for the ore-fleet operator console
// ABOUTME: init() writes to stderr, init_file() writes to a file and keeps alerts on stderr

use std::path::Path;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .init();
}

/// File-based logging for unattended runs. Default: INFO level, RUST_LOG override.
/// Appends to `path`, creating parent directories as needed. WARN and above
/// (worker stderr alerts, supervision failures) are still printed to stderr.
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(path: &Path) {
    if let Err(e) = init_file_inner(path) {
        eprintln!("Warning: failed to set up file logging: {e}");
    }
}

fn init_file_inner(path: &Path) -> Result<(), BoxError> {
    let log_file = open_log_file(path)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false)
        .with_filter(default_filter());
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    Ok(())
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}

fn default_filter() -> EnvFilter {
    EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

#[cfg(test)]
mod tests {
    #[test]
    fn exports_init() {
        let _ = super::init as fn();
    }

    #[test]
    fn exports_init_file() {
        let _ = super::init_file as fn(&std::path::Path);
    }

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("fleet.log");

        super::open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_file_installs_subscriber_with_console_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.log");

        // Only this test installs a global subscriber in this crate.
        super::init_file_inner(&path).unwrap();
        tracing::info!("status line for the file");
        tracing::warn!("alert for the console and the file");

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("status line for the file"));
        assert!(content.contains("alert for the console and the file"));
    }
}
