// ============================================================================
// splatseq-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types and Helpers for splatseq-core
//
// A single error enum covers every failure the library can surface: input
// lookup, container decoding, range validation, prediction, PLY parsing and
// writing, settings documents and external command execution.
//
// KEY COMPONENTS:
// - CoreError: the error enum
// - CoreResult: result alias used across the crate
// - command_*_error: constructors for ffmpeg/ffprobe failures

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors produced by splatseq-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An input path does not exist.
    #[error("Path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A container or file exists but cannot be opened or decoded.
    #[error("Cannot open {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// A read was attempted on a video handle after it was closed.
    #[error("Video handle for {} has been closed", .0.display())]
    HandleClosed(PathBuf),

    /// Malformed or out-of-bounds frame range.
    #[error("Invalid frame range: {0}")]
    InvalidRange(String),

    #[error("Invalid focal length: {0} (must be a positive, finite number of pixels)")]
    InvalidFocalLength(f64),

    /// Downconversion source has no `vertex` element.
    #[error("No 'vertex' element found in {}", .0.display())]
    MissingVertexElement(PathBuf),

    /// Header or payload of a PLY file could not be parsed.
    #[error("Malformed PLY data: {0}")]
    PlyFormat(String),

    /// The predictor failed, including resource exhaustion.
    #[error("Prediction failed: {0}")]
    PredictionFailure(String),

    /// Filesystem error while writing an output artifact.
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Failed to execute {0}: {1}")]
    CommandStart(String, #[source] std::io::Error),

    #[error("Command {0} failed with status {1}. Stderr: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("Video metadata error: {0}")]
    VideoInfo(String),

    /// The run was stopped through its cancellation token.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type alias used throughout splatseq-core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Wraps a failure to launch an external command.
pub fn command_start_error(cmd: impl Into<String>, source: std::io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), source)
}

/// Wraps a non-zero exit of an external command.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

/// Attaches the destination path to an IO error raised while writing output.
pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::WriteFailure {
        path: path.into(),
        source,
    }
}
