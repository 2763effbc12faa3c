//! Standalone extended-to-standard PLY converter.
//!
//! Usage: `splat-convert <INPUT> [OUTPUT]`

use clap::Parser;
use splatseq::ConvertToolArgs;
use splatseq_core::utils::{default_standard_path, format_bytes};
use splatseq_core::{PlyEncoding, downconvert};
use std::process;

fn main() {
    let args = ConvertToolArgs::parse();
    let output = args
        .output
        .unwrap_or_else(|| default_standard_path(&args.input));

    println!("Converting {} -> {}", args.input.display(), output.display());
    match downconvert(&args.input, &output, PlyEncoding::BinaryLittleEndian) {
        Ok(summary) => {
            println!(
                "Written {} ({})",
                summary.destination.display(),
                format_bytes(summary.bytes_written)
            );
            println!("Number of Gaussian elements: {}", summary.vertex_count);
        }
        Err(error) => {
            eprintln!("Error: {error}");
            process::exit(1);
        }
    }
}
