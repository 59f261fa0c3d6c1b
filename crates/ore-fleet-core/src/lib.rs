// ABOUTME: Shared types and configuration for ore-fleet.
// ABOUTME: Contains config parsing, the stdout message protocol, and timing state.

pub mod config;
pub mod error;
pub mod protocol;
pub mod tracker;

pub use config::{Config, WorkerSpec};
pub use error::{FleetError, Result};
pub use protocol::{decode, ProtocolMessage};
pub use tracker::{LandedTiming, TimestampTracker};
