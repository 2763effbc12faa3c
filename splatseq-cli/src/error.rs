// ============================================================================
// splatseq-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: Error types and utilities for the CLI
//
// KEY COMPONENTS:
// - CliResult: Type alias for CLI operations
// - CliErrorContext: attaches a human-readable context to core errors

use splatseq_core::{CoreError, CoreResult};
use std::fmt;

/// Type alias for CLI results using CoreError.
pub type CliResult<T> = CoreResult<T>;

/// Extension trait for adding context to errors in the CLI.
pub trait CliErrorContext<T> {
    /// Add context to an error.
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display;

    /// Add context using a closure (for lazy evaluation).
    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C;
}

impl<T, E> CliErrorContext<T> for Result<T, E>
where
    E: Into<CoreError>,
{
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{context}: {core_error}"))
        })
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.map_err(|e| {
            let core_error: CoreError = e.into();
            CoreError::OperationFailed(format!("{}: {core_error}", f()))
        })
    }
}

impl<T> CliErrorContext<T> for Option<T> {
    fn cli_context<C>(self, context: C) -> CliResult<T>
    where
        C: fmt::Display,
    {
        self.ok_or_else(|| CoreError::OperationFailed(context.to_string()))
    }

    fn cli_with_context<C, F>(self, f: F) -> CliResult<T>
    where
        C: fmt::Display,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| CoreError::OperationFailed(f().to_string()))
    }
}

/// Suggestion shown next to an error, when there is an obvious next step.
pub fn suggestion_for(error: &CoreError) -> Option<String> {
    match error {
        CoreError::NotFound(_) => Some("Check the path and try again".to_string()),
        CoreError::CommandStart(..) => {
            Some("Make sure ffmpeg and ffprobe are installed and on PATH".to_string())
        }
        CoreError::InvalidRange(_) => {
            Some("Run `splatseq info <video>` to see the frame count".to_string())
        }
        CoreError::Settings(_) => {
            Some("Run `splatseq settings reset` to restore the defaults".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_core_errors() {
        let result: Result<(), CoreError> = Err(CoreError::InvalidRange("bad".into()));
        let err = result.cli_context("Export failed").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Operation failed: Export failed: Invalid frame range: bad"
        );
    }

    #[test]
    fn none_becomes_operation_failed() {
        let value: Option<u8> = None;
        let err = value.cli_with_context(|| "missing value").unwrap_err();
        assert!(matches!(err, CoreError::OperationFailed(_)));
    }
}
