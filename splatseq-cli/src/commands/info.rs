// ============================================================================
// splatseq-cli/src/commands/info.rs
// ============================================================================
//
// INFO COMMAND: Container metadata and focal length estimate for one video

use crate::cli::InfoArgs;
use crate::error::{CliErrorContext, CliResult};
use log::info;
use splatseq_core::config::DEFAULT_FOV_DEGREES;
use splatseq_core::reporting::{Reporter, VideoSummary};
use splatseq_core::video::SidecarVideoBackend;
use splatseq_core::{VideoHandle, estimate_focal_length};

/// Probes the video and reports its summary.
pub fn run_info(args: &InfoArgs, reporter: &dyn Reporter) -> CliResult<()> {
    let handle = VideoHandle::open(&SidecarVideoBackend, &args.video)?;
    let video = handle
        .info()
        .cli_with_context(|| format!("Failed to read metadata of {}", args.video.display()))?;

    let fov = args.fov.unwrap_or(DEFAULT_FOV_DEGREES);
    let focal = estimate_focal_length(video.width, video.height, fov);
    info!(
        "{}: {}x{}, {} frames at {:.3} fps, f = {:.2}px",
        args.video.display(),
        video.width,
        video.height,
        video.frame_count,
        video.fps,
        focal
    );

    reporter.video_summary(&VideoSummary {
        input_file: args.video.display().to_string(),
        resolution: format!("{}x{}", video.width, video.height),
        frame_count: video.frame_count,
        fps: video.fps,
        duration: video.duration_formatted(),
        focal_length_px: focal,
        focal_source: format!("estimated from {fov:.1} degree FOV"),
    });
    Ok(())
}
