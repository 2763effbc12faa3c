//! Command implementations for the CLI.
//!
//! Each submodule contains the implementation of a specific command.

/// `convert`: extended to standard PLY
pub mod convert;

/// `generate`: video frame range to PLY sequence
pub mod generate;

/// `info`: video metadata and focal length estimate
pub mod info;

/// `settings`: show, reset or edit the settings document
pub mod settings;
