// ABOUTME: Worker process supervision: spawning and output capture.
// ABOUTME: Exposes WorkerSupervisor and the timestamped log file writer.

mod logfile;
mod spawn;

pub use logfile::{LogFile, TIMESTAMP_FORMAT};
pub use spawn::{
    WorkerExit, WorkerSupervisor, MAX_LINE_BYTES, MESSAGES_LOG, STDERR_LOG, STDOUT_LOG,
};
