//! Library component for the splatseq CLI application.
//!
//! Argument definitions and command logic live here so the binaries stay
//! thin and the integration tests can reach them.

/// Command-line interface definitions using clap
pub mod cli;

/// Command implementations for each subcommand
pub mod commands;

/// Error handling utilities for the CLI
pub mod error;

/// Run log setup
pub mod logging;

// Re-exports for convenience
pub use cli::{Cli, Commands, ConvertArgs, ConvertToolArgs, GenerateArgs, InfoArgs, SettingsArgs, parse_cli, parse_cli_from};
pub use commands::convert::run_convert;
pub use commands::generate::run_generate;
pub use commands::info::run_info;
pub use commands::settings::run_settings;
