//! Core library for turning video frames into 3D Gaussian splat sequences.
//!
//! This crate decodes frame ranges from a video, projects every frame into a
//! camera-space Gaussian set through a pluggable predictor, and writes one
//! PLY file per frame, optionally reduced to the standard vertex-only schema.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use splatseq_core::config::Settings;
//! use splatseq_core::export::{ExportOptions, SequenceExporter};
//! use splatseq_core::predictor::BaseDepthPredictor;
//! use splatseq_core::reporting::TerminalReporter;
//! use splatseq_core::video::{SidecarVideoBackend, VideoHandle};
//! use splatseq_core::estimate_focal_length;
//! use std::path::Path;
//!
//! # fn main() -> splatseq_core::CoreResult<()> {
//! let settings = Settings::load(Path::new("settings.json"))?.settings;
//! let predictor = BaseDepthPredictor::new(settings.predictor_params())?;
//!
//! let mut video = VideoHandle::open(&SidecarVideoBackend, Path::new("clip.mp4"))?;
//! let info = video.info()?;
//! let focal = estimate_focal_length(info.width, info.height, 50.0);
//!
//! let reporter = TerminalReporter::new();
//! let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &reporter);
//! let report = exporter.run(&mut video, 0, 9, focal, Path::new("output"))?;
//! println!("{} of {} frames exported", report.succeeded, report.attempted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod file_logging;
pub mod gaussians;
pub mod ply;
pub mod predictor;
pub mod processing;
pub mod reporting;
pub mod utils;
pub mod video;

// Re-exports for public API
pub use config::Settings;
pub use error::{CoreError, CoreResult};
pub use export::{CancellationToken, ExportOptions, ExportReport, SequenceExporter};
pub use gaussians::{Gaussian, GaussianSet3D, GaussianSetNdc};
pub use ply::{ConversionSummary, PlyEncoding, PlyFile, downconvert};
pub use predictor::{BaseDepthPredictor, GaussianPredictor};
pub use processing::{CameraIntrinsics, estimate_focal_length, project_frame};
pub use utils::{format_bytes, format_duration, is_supported_video};
pub use video::{Frame, VideoHandle, VideoInfo};
