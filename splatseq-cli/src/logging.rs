// ============================================================================
// splatseq-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Per-run log files
//
// Each command that does real work gets its own log file named
// `splatseq_<command>_<timestamp>.log`, written through log4rs.

use crate::error::CliResult;
use log::LevelFilter;
use splatseq_core::CoreError;
use splatseq_core::file_logging::run_log_path;
use splatseq_core::file_logging::setup::setup_file_logging;
use std::path::{Path, PathBuf};

/// Debug when verbose, Info otherwise.
pub fn log_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Creates `log_dir` and routes the `log` facade to a fresh run log there.
///
/// Returns the log file path.
pub fn start_run_log(log_dir: &Path, command: &str, level: LevelFilter) -> CliResult<PathBuf> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        CoreError::OperationFailed(format!(
            "Failed to create log directory: {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let log_path = run_log_path(log_dir, command);
    setup_file_logging(&log_path, level).map_err(|e| {
        CoreError::OperationFailed(format!(
            "Failed to set up file logging to {}: {}",
            log_path.display(),
            e
        ))
    })?;

    log::info!("splatseq {} starting", env!("CARGO_PKG_VERSION"));
    if level == LevelFilter::Debug {
        log::info!("Debug level logging enabled");
    }
    Ok(log_path)
}
