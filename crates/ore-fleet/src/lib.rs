// ABOUTME: ore-fleet library: worker supervision, message dispatch, orchestration.
// ABOUTME: Entry points used by the CLI and the integration tests.

pub mod dispatch;
pub mod orchestrator;
pub mod supervisor;

pub use dispatch::{render, Dispatched, MessageDispatcher};
pub use orchestrator::{Orchestrator, RunReport, WorkerOutcome, DEFAULT_STAGGER};
pub use ore_fleet_core::{Config, TimestampTracker, WorkerSpec};
pub use supervisor::{LogFile, WorkerExit, WorkerSupervisor};

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Options for a fleet run
pub struct RunOptions {
    /// Path to configuration file
    pub config_path: Option<PathBuf>,
    /// Override for the delay between worker launches
    pub stagger: Option<Duration>,
}

fn resolve_config_path(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Config::default_path().context("Failed to get default config path"),
    }
}

/// Load the config, launch every worker, and wait for them all.
///
/// Fails with the first worker's failure, but only after every worker settled.
pub async fn run_fleet(options: RunOptions) -> Result<()> {
    let config_path = resolve_config_path(options.config_path)?;
    let config = Config::load(&config_path)?;
    tracing::info!("Launching with config:\n{}", config);

    let workers = config.build_workers()?;
    let log_root = config.create_run_log_root()?;
    tracing::info!(workers = workers.len(), log_root = %log_root.display(), "Writing worker logs");

    let tracker = Arc::new(TimestampTracker::new());
    let mut orchestrator = Orchestrator::new(workers, &log_root, tracker)?;
    if let Some(stagger) = options.stagger {
        orchestrator = orchestrator.with_stagger(stagger);
    }

    orchestrator.run().await.into_result()?;
    Ok(())
}

/// Print each worker's name and command without launching anything.
pub fn print_commands(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config_path = resolve_config_path(config_path)?;
    let config = Config::load(&config_path)?;
    let workers = config.build_workers()?;

    if json {
        let listing: Vec<serde_json::Value> = workers
            .iter()
            .map(|w| serde_json::json!({ "name": w.name, "command": w.command }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else {
        for worker in &workers {
            println!("{}: {}", worker.name, worker.command.join(" "));
        }
    }
    Ok(())
}
