//! Per-run log files.
//!
//! Each CLI invocation writes one log file named after the command and the
//! start time, e.g. `splatseq_generate_20250101_120000.log`.

pub mod setup;

use crate::utils::get_timestamp;
use std::path::{Path, PathBuf};

/// Builds the log file path for a command run inside `log_dir`.
#[must_use]
pub fn run_log_path(log_dir: &Path, command: &str) -> PathBuf {
    log_dir.join(format!("splatseq_{}_{}.log", command, get_timestamp()))
}
