// ============================================================================
// splatseq-cli/src/commands/convert.rs
// ============================================================================
//
// CONVERT COMMAND: Extended PLY to standard vertex-only PLY

use crate::cli::ConvertArgs;
use crate::error::CliResult;
use splatseq_core::reporting::Reporter;
use splatseq_core::utils::default_standard_path;
use splatseq_core::{ConversionSummary, PlyEncoding, downconvert};

/// Converts one file, writing `<stem>_standard.ply` when no output is given.
pub fn run_convert(args: &ConvertArgs, reporter: &dyn Reporter) -> CliResult<ConversionSummary> {
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| default_standard_path(&args.input));
    let encoding = if args.ascii {
        PlyEncoding::Ascii
    } else {
        PlyEncoding::BinaryLittleEndian
    };

    let summary = downconvert(&args.input, &destination, encoding)?;
    reporter.conversion_complete(&summary);
    Ok(summary)
}
