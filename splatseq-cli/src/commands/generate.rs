// ============================================================================
// splatseq-cli/src/commands/generate.rs
// ============================================================================
//
// GENERATE COMMAND: Video frame range to PLY sequence
//
// Loads the settings document, builds the predictor, resolves the focal
// length and frame range, then hands the work to the core exporter.
//
// KEY COMPONENTS:
// - run_generate: command entry point
// - resolve_focal: --focal, --fov or the default field of view
// - resolve_output_dir: --output, the `output_dir` setting, or ./output

use crate::cli::{DEFAULT_SETTINGS_FILE, GenerateArgs};
use crate::error::{CliErrorContext, CliResult};
use log::{info, warn};
use splatseq_core::config::DEFAULT_FOV_DEGREES;
use splatseq_core::processing::focal::estimate_default_focal_length;
use splatseq_core::reporting::{Reporter, VideoSummary};
use splatseq_core::video::SidecarVideoBackend;
use splatseq_core::{
    BaseDepthPredictor, CoreError, ExportOptions, ExportReport, PlyEncoding, SequenceExporter,
    Settings, VideoHandle, VideoInfo, estimate_focal_length,
};
use std::path::{Path, PathBuf};

/// Output directory used when neither `--output` nor the settings name one.
pub const FALLBACK_OUTPUT_DIR: &str = "output";

/// Where the output directory comes from, in priority order.
pub fn resolve_output_dir(args: &GenerateArgs, settings: &Settings) -> PathBuf {
    args.output_dir
        .clone()
        .or_else(|| settings.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_OUTPUT_DIR))
}

/// Focal length in pixels and a description of where it came from.
pub fn resolve_focal(args: &GenerateArgs, video: &VideoInfo) -> (f64, String) {
    match (args.focal, args.fov) {
        (Some(focal), _) => (focal, "--focal".to_string()),
        (None, Some(fov)) => (
            estimate_focal_length(video.width, video.height, fov),
            format!("estimated from {fov:.1} degree FOV"),
        ),
        (None, None) => (
            estimate_default_focal_length(video.width, video.height),
            format!("estimated from default {DEFAULT_FOV_DEGREES:.1} degree FOV"),
        ),
    }
}

/// Exports the requested frame range and remembers the paths used.
pub fn run_generate(args: &GenerateArgs, reporter: &dyn Reporter) -> CliResult<ExportReport> {
    let settings_path = args
        .settings
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let loaded = Settings::load(&settings_path)?;
    for warning in &loaded.warnings {
        warn!("{warning}");
        reporter.warning(&warning.to_string());
    }
    let mut settings = loaded.settings;
    settings.validate()?;

    let (resolution, rounded) = settings.effective_processing_resolution();
    if rounded {
        reporter.warning(&format!(
            "processing_resolution {} rounded to {}",
            settings.processing_resolution, resolution
        ));
    }
    for deviation in settings.checkpoint_deviations() {
        reporter.warning(&format!(
            "'{}' differs from the checkpoint default ({} vs {}); results may be wrong",
            deviation.key, deviation.current, deviation.default
        ));
    }

    let predictor = BaseDepthPredictor::new(settings.predictor_params())?;

    let mut handle = VideoHandle::open(&SidecarVideoBackend, &args.video)?;
    let video = handle
        .info()
        .cli_with_context(|| format!("Failed to read metadata of {}", args.video.display()))?;
    let (focal, focal_source) = resolve_focal(args, &video);
    reporter.video_summary(&VideoSummary {
        input_file: args.video.display().to_string(),
        resolution: format!("{}x{}", video.width, video.height),
        frame_count: video.frame_count,
        fps: video.fps,
        duration: video.duration_formatted(),
        focal_length_px: focal,
        focal_source,
    });

    let end = match args.end {
        Some(end) => end,
        None if video.frame_count > 0 => video.frame_count - 1,
        None => {
            return Err(CoreError::InvalidRange(
                "frame count is unknown; pass --end explicitly".to_string(),
            ));
        }
    };

    let options = ExportOptions {
        downconvert: settings.auto_convert_to_standard && !args.keep_extended,
        encoding: if args.ascii {
            PlyEncoding::Ascii
        } else {
            settings.ply_encoding
        },
    };
    let out_dir = resolve_output_dir(args, &settings);
    info!(
        "Generating frames {}..={} from {} into {} ({} encoding, downconvert: {})",
        args.start,
        end,
        args.video.display(),
        out_dir.display(),
        options.encoding,
        options.downconvert
    );

    let exporter = SequenceExporter::new(&predictor, options, reporter);
    let report = exporter.run(&mut handle, args.start, end, focal, &out_dir)?;
    handle.close();

    if loaded.from_file || args.settings.is_some() {
        remember_paths(&mut settings, &args.video, &out_dir);
        if let Err(e) = settings.save(&settings_path) {
            reporter.warning(&format!("Could not update {}: {e}", settings_path.display()));
        }
    }

    if report.all_failed() {
        return Err(CoreError::OperationFailed(format!(
            "All {} frames failed to export",
            report.attempted
        )));
    }
    Ok(report)
}

fn remember_paths(settings: &mut Settings, video: &Path, out_dir: &Path) {
    settings.last_video_path = Some(video.display().to_string());
    settings.last_output_dir = Some(out_dir.display().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Commands, parse_cli_from};
    use approx::assert_relative_eq;

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["splatseq", "generate", "clip.mp4"];
        argv.extend_from_slice(extra);
        match parse_cli_from(argv).command {
            Commands::Generate(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    fn full_hd() -> VideoInfo {
        VideoInfo {
            frame_count: 100,
            fps: 30.0,
            width: 1920,
            height: 1080,
        }
    }

    #[test]
    fn explicit_focal_wins() {
        let (focal, source) = resolve_focal(&generate_args(&["--focal", "1234"]), &full_hd());
        assert_relative_eq!(focal, 1234.0);
        assert_eq!(source, "--focal");
    }

    #[test]
    fn fov_estimate_uses_width() {
        let (focal, _) = resolve_focal(&generate_args(&["--fov", "90"]), &full_hd());
        assert_relative_eq!(focal, 960.0, epsilon = 1e-9);
    }

    #[test]
    fn default_fov_estimate() {
        let (focal, source) = resolve_focal(&generate_args(&[]), &full_hd());
        assert_relative_eq!(focal, estimate_default_focal_length(1920, 1080));
        assert!(source.contains("default"));
    }

    #[test]
    fn output_dir_priority() {
        let mut settings = Settings::default();
        assert_eq!(
            resolve_output_dir(&generate_args(&[]), &settings),
            PathBuf::from(FALLBACK_OUTPUT_DIR)
        );

        settings.output_dir = Some("from_settings".into());
        assert_eq!(
            resolve_output_dir(&generate_args(&[]), &settings),
            PathBuf::from("from_settings")
        );
        assert_eq!(
            resolve_output_dir(&generate_args(&["-o", "cli"]), &settings),
            PathBuf::from("cli")
        );
    }

    #[test]
    fn remembered_paths() {
        let mut settings = Settings::default();
        remember_paths(&mut settings, Path::new("in/clip.mp4"), Path::new("out"));
        assert_eq!(settings.last_video_path.as_deref(), Some("in/clip.mp4"));
        assert_eq!(settings.last_output_dir.as_deref(), Some("out"));
    }
}
