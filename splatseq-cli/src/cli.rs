// splatseq-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Settings document used when `--settings` is not given.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "splatseq: video to Gaussian splat sequence exporter",
    long_about = "Projects video frames into 3D Gaussian splats and writes one PLY file per frame."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Shows container metadata and the estimated focal length of a video
    Info(InfoArgs),
    /// Exports a frame range of a video as a PLY sequence
    Generate(GenerateArgs),
    /// Reduces an extended PLY file to the standard vertex-only schema
    Convert(ConvertArgs),
    /// Inspects or edits the settings document
    Settings(SettingsArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {
    /// Video file to inspect
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Horizontal field of view used for the focal length estimate
    #[arg(long, value_name = "DEGREES")]
    pub fov: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    /// Video file to export
    #[arg(value_name = "VIDEO")]
    pub video: PathBuf,

    /// Output directory (defaults to the `output_dir` setting, then ./output)
    #[arg(short = 'o', long = "output", value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// First frame index (inclusive)
    #[arg(long, default_value_t = 0)]
    pub start: u64,

    /// Last frame index (inclusive, defaults to the last frame)
    #[arg(long)]
    pub end: Option<u64>,

    /// Focal length in pixels; overrides the field-of-view estimate
    #[arg(long, value_name = "PIXELS", conflicts_with = "fov")]
    pub focal: Option<f64>,

    /// Horizontal field of view used to estimate the focal length
    #[arg(long, value_name = "DEGREES")]
    pub fov: Option<f64>,

    /// Settings document
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Keep extended PLY files instead of converting them
    #[arg(long)]
    pub keep_extended: bool,

    /// Write ASCII PLY files
    #[arg(long)]
    pub ascii: bool,

    /// Emit progress as line-delimited JSON on stdout
    #[arg(long)]
    pub progress_json: bool,

    /// Directory for log files (defaults to OUTPUT_DIR/logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long)]
    pub no_log: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct ConvertArgs {
    /// Extended PLY file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination (defaults to <input-stem>_standard.ply next to the input)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Write an ASCII PLY file
    #[arg(long)]
    pub ascii: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SettingsArgs {
    /// Settings document
    #[arg(long, value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub action: SettingsAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    /// Prints the effective settings as JSON
    Show,
    /// Writes the default settings
    Reset,
    /// Sets one key to a JSON value and saves
    Set {
        key: String,
        /// JSON value, e.g. `1536`, `"cpu"` or `true`
        value: String,
    },
}

/// Arguments of the standalone `splat-convert` tool.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "splat-convert",
    version,
    about = "Keeps only the vertex element of an extended Gaussian splat PLY file"
)]
pub struct ConvertToolArgs {
    /// Extended PLY file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Destination (defaults to <input-stem>_standard.ply next to the input)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}

/// Parses the process arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parses an explicit argument list.
pub fn parse_cli_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}
