// ABOUTME: Configuration for the ore-fleet orchestrator.
// ABOUTME: Loads JSON or TOML, discovers keypairs, and builds per-worker commands.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// One worker to supervise: its unique name and the argv to launch it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub name: String,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the miner binary
    pub ore_bin: String,

    /// Directory holding one keypair file per worker (e.g. `id_keypair_0.json`)
    pub keypairs_dir: String,

    /// RPC endpoints; keypairs are split across them in contiguous blocks
    pub rpcs: Vec<String>,

    /// Spare RPC endpoint, recorded for the launch banner
    #[serde(default)]
    pub fallback_rpc: Option<String>,

    #[serde(default)]
    pub priority_fee_per_unit_mc_lamports: u64,

    #[serde(default)]
    pub confirm_retries: u32,

    /// Seconds between confirmation attempts
    #[serde(default)]
    pub confirm_interval: u64,

    #[serde(default)]
    pub gateway_retries: u32,

    /// Root for per-run log directories
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,

    /// Pass `--thread-pool` to every worker
    #[serde(default)]
    pub thread_pool: bool,

    /// Pass `--dynamic-config` to every worker
    #[serde(default)]
    pub dynamic_config: bool,

    /// Hashing threads per worker; defaults to the host's available parallelism
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_logs_dir() -> String {
    "logs".to_string()
}

impl Config {
    /// Load config from a file. `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let config: Config = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path (~/.config/ore-fleet/fleet.toml)
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("ore-fleet");
        Ok(config_dir.join("fleet.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.rpcs.is_empty() {
            anyhow::bail!("Config must list at least one rpc endpoint");
        }
        if self.ore_bin.trim().is_empty() {
            anyhow::bail!("Config ore_bin must not be empty");
        }
        Ok(())
    }

    /// Expand ~ in the keypairs directory path
    pub fn keypairs_dir_expanded(&self) -> PathBuf {
        shellexpand::tilde(&self.keypairs_dir).into_owned().into()
    }

    /// Expand ~ in the logs directory path
    pub fn logs_dir_expanded(&self) -> PathBuf {
        shellexpand::tilde(&self.logs_dir).into_owned().into()
    }

    /// Keypair file names in `keypairs_dir`, ordered by their numeric index.
    pub fn keypairs(&self) -> Result<Vec<String>> {
        let dir = self.keypairs_dir_expanded();
        let mut indexed = Vec::new();

        let entries = std::fs::read_dir(&dir)
            .with_context(|| format!("Failed to read keypairs from {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            let name = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };

            // Skip hidden files
            if name.starts_with('.') {
                continue;
            }

            let index = keypair_index(&name).with_context(|| {
                format!("Keypair file {} has no numeric index (expected e.g. id_keypair_0.json)", name)
            })?;
            indexed.push((index, name));
        }

        indexed.sort();
        Ok(indexed.into_iter().map(|(_, name)| name).collect())
    }

    /// Build the worker set: one per keypair, in keypair order.
    pub fn build_workers(&self) -> Result<Vec<WorkerSpec>> {
        self.validate()?;
        let keypairs = self.keypairs()?;
        if keypairs.is_empty() {
            anyhow::bail!(
                "No keypairs found in {}",
                self.keypairs_dir_expanded().display()
            );
        }

        let accounts_per_rpc = keypairs.len().div_ceil(self.rpcs.len());
        let threads = self.threads.unwrap_or_else(default_threads).to_string();
        let keypairs_dir = self.keypairs_dir_expanded();

        let workers = keypairs
            .iter()
            .enumerate()
            .map(|(i, keypair)| {
                let keypair_path = keypairs_dir.join(keypair);
                let mut command = vec![
                    self.ore_bin.clone(),
                    "--keypair".to_string(),
                    keypair_path.display().to_string(),
                    "--rpc".to_string(),
                    self.rpcs[i / accounts_per_rpc].clone(),
                    "--priority-fee".to_string(),
                    self.priority_fee_per_unit_mc_lamports.to_string(),
                    "--confirm-retries".to_string(),
                    self.confirm_retries.to_string(),
                    "--confirm-interval".to_string(),
                    self.confirm_interval.to_string(),
                    "--gateway-retries".to_string(),
                    self.gateway_retries.to_string(),
                    "mine".to_string(),
                    "--threads".to_string(),
                    threads.clone(),
                ];
                if self.thread_pool {
                    command.push("--thread-pool".to_string());
                }
                if self.dynamic_config {
                    command.push("--dynamic-config".to_string());
                }
                WorkerSpec {
                    name: worker_name(keypair),
                    command,
                }
            })
            .collect();

        Ok(workers)
    }

    /// Create a fresh log root for this run: `{logs_dir}/{local timestamp}`.
    pub fn create_run_log_root(&self) -> Result<PathBuf> {
        let stamp = chrono::Local::now()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();
        let root = self.logs_dir_expanded().join(stamp);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create log directory {}", root.display()))?;
        Ok(root)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&pretty)
    }
}

/// Worker name for a keypair file: the file name up to its first dot.
pub fn worker_name(keypair_file: &str) -> String {
    keypair_file
        .split('.')
        .next()
        .unwrap_or(keypair_file)
        .to_string()
}

/// Numeric index of a keypair file, taken from the last `_` segment of its stem.
pub fn keypair_index(keypair_file: &str) -> Option<u64> {
    worker_name(keypair_file).rsplit('_').next()?.parse().ok()
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
