//! Run accounting and cooperative cancellation.

use crate::error::CoreError;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared stop flag, checked before each frame starts.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A frame that could not be exported.
#[derive(Debug)]
pub struct FrameFailure {
    pub index: u64,
    pub error: CoreError,
}

/// Outcome of one export run.
#[derive(Debug)]
pub struct ExportReport {
    pub session_dir: PathBuf,
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<FrameFailure>,
    /// Final artifact per successful frame, in frame order.
    pub written: Vec<PathBuf>,
    pub bytes_written: u64,
    pub cancelled: bool,
}

impl ExportReport {
    pub(crate) fn new(session_dir: PathBuf) -> Self {
        Self {
            session_dir,
            attempted: 0,
            succeeded: 0,
            failures: Vec::new(),
            written: Vec::new(),
            bytes_written: 0,
            cancelled: false,
        }
    }

    /// Indices to feed back into a retry.
    pub fn failed_indices(&self) -> Vec<u64> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// True when frames were attempted and none succeeded.
    pub fn all_failed(&self) -> bool {
        self.attempted > 0 && self.succeeded == 0
    }
}
