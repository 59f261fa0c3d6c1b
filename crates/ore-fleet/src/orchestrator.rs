// ABOUTME: Fans out one supervisor task per worker with staggered launches.
// ABOUTME: Joins every worker before reporting, surfacing the first failure afterwards.

use crate::dispatch::MessageDispatcher;
use crate::supervisor::{WorkerExit, WorkerSupervisor};
use anyhow::Result;
use ore_fleet_core::{TimestampTracker, WorkerSpec};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Delay between consecutive worker launches.
pub const DEFAULT_STAGGER: Duration = Duration::from_secs(1);

/// How one worker's supervision settled.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub name: String,
    /// When the worker was launched, relative to the start of the run.
    /// None if its task never reached launch.
    pub launch_offset: Option<Duration>,
    pub result: Result<WorkerExit>,
}

#[derive(Debug)]
pub struct RunReport {
    /// In worker order.
    pub outcomes: Vec<WorkerOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// The first failed worker's error, in worker order.
    pub fn into_result(self) -> Result<Vec<WorkerExit>> {
        let mut exits = Vec::with_capacity(self.outcomes.len());
        for outcome in self.outcomes {
            let exit = outcome
                .result
                .map_err(|e| e.context(format!("Worker {} failed", outcome.name)))?;
            exits.push(exit);
        }
        Ok(exits)
    }
}

pub struct Orchestrator {
    workers: Vec<WorkerSpec>,
    log_root: PathBuf,
    dispatcher: MessageDispatcher,
    stagger: Duration,
}

impl Orchestrator {
    pub fn new(
        workers: Vec<WorkerSpec>,
        log_root: &Path,
        tracker: Arc<TimestampTracker>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for worker in &workers {
            if !seen.insert(worker.name.as_str()) {
                anyhow::bail!("Duplicate worker name: {}", worker.name);
            }
        }

        Ok(Self {
            workers,
            log_root: log_root.to_path_buf(),
            dispatcher: MessageDispatcher::new(tracker),
            stagger: DEFAULT_STAGGER,
        })
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// Launch worker `i` after `i * stagger` and wait for all of them.
    pub async fn run(self) -> RunReport {
        let started = Instant::now();
        tracing::info!(count = self.workers.len(), stagger = ?self.stagger, "Launching workers");

        let mut names = Vec::with_capacity(self.workers.len());
        let mut handles = Vec::with_capacity(self.workers.len());

        for (i, spec) in self.workers.into_iter().enumerate() {
            names.push(spec.name.clone());
            let delay = launch_delay(self.stagger, i);
            let dispatcher = self.dispatcher.clone();
            let supervisor = WorkerSupervisor::new(spec, &self.log_root);

            handles.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let launch_offset = started.elapsed();
                let result = supervisor.run(&dispatcher).await;
                (launch_offset, result)
            }));
        }

        let joined = futures::future::join_all(handles).await;

        let outcomes: Vec<WorkerOutcome> = names
            .into_iter()
            .zip(joined)
            .map(|(name, joined)| {
                let (launch_offset, result) = match joined {
                    Ok((offset, result)) => (Some(offset), result),
                    Err(e) => (None, Err(anyhow::anyhow!("Supervisor task aborted: {}", e))),
                };
                if let Err(ref e) = result {
                    tracing::error!(worker = %name, error = %format!("{:#}", e), "Worker supervision failed");
                }
                WorkerOutcome {
                    name,
                    launch_offset,
                    result,
                }
            })
            .collect();

        let report = RunReport { outcomes };
        tracing::info!(
            failures = report.failures(),
            elapsed = ?started.elapsed(),
            "All subprocesses have completed."
        );
        report
    }
}

/// `index * stagger`, saturating at `Duration::MAX`.
fn launch_delay(stagger: Duration, index: usize) -> Duration {
    u32::try_from(index)
        .ok()
        .and_then(|i| stagger.checked_mul(i))
        .unwrap_or(Duration::MAX)
}
