// ABOUTME: ore-fleet CLI entry point.
// ABOUTME: Provides run and commands subcommands.

use clap::{Parser, Subcommand};
use ore_fleet::{print_commands, run_fleet, RunOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "ore-fleet")]
#[command(about = "Supervisor for a fleet of ore mining workers")]
struct Cli {
    /// Write status lines to this file instead of stderr
    #[arg(long, global = true, env = "ORE_FLEET_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch every worker and supervise it until it exits
    Run {
        /// Path to configuration file (JSON or TOML)
        config: Option<PathBuf>,
        /// Seconds between consecutive worker launches
        #[arg(long)]
        stagger_secs: Option<u64>,
    },
    /// Print the command each worker would be launched with
    Commands {
        /// Path to configuration file (JSON or TOML)
        config: Option<PathBuf>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match &cli.log_file {
        Some(path) => ore_fleet_log::init_file(path),
        None => ore_fleet_log::init(),
    }

    match cli.command {
        Commands::Run {
            config,
            stagger_secs,
        } => {
            run_fleet(RunOptions {
                config_path: config,
                stagger: stagger_secs.map(Duration::from_secs),
            })
            .await
        }
        Commands::Commands { config, json } => print_commands(config, json),
    }
}
