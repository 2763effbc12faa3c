//! ffprobe/ffmpeg backed frame source.

use super::{Frame, FrameStream, VideoBackend, VideoInfo};
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use ffprobe::{FfProbeError, ffprobe};
use image::RgbImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Probes containers with `ffprobe` and decodes them with `ffmpeg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarVideoBackend;

impl VideoBackend for SidecarVideoBackend {
    type Stream = SidecarStream;

    fn open(&self, path: &Path) -> CoreResult<SidecarStream> {
        let info = probe(path)?;
        Ok(SidecarStream {
            path: path.to_path_buf(),
            info,
        })
    }
}

/// Decodes on demand; every read spawns one `ffmpeg` process.
#[derive(Debug)]
pub struct SidecarStream {
    path: PathBuf,
    info: VideoInfo,
}

impl FrameStream for SidecarStream {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_frame(&mut self, index: u64) -> CoreResult<Option<Frame>> {
        let mut found = None;
        self.read_frames(index, index, &mut |frame: Frame| {
            found = Some(frame);
            Ok(false)
        })?;
        Ok(found)
    }

    fn read_frames(
        &mut self,
        start: u64,
        end: u64,
        visit: &mut dyn FnMut(Frame) -> CoreResult<bool>,
    ) -> CoreResult<()> {
        let count = end.saturating_sub(start) + 1;
        let select = format!("select=between(n\\,{start}\\,{end})");
        let frames_arg = count.to_string();

        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner()
            .input(self.path.to_string_lossy().as_ref())
            .args(["-vf", select.as_str()])
            .args(["-fps_mode", "passthrough"])
            .args(["-frames:v", frames_arg.as_str()])
            .rawvideo();
        debug!("Decoding frames {start}..={end} of {}", self.path.display());

        let mut child = cmd
            .spawn()
            .map_err(|e| command_start_error("ffmpeg (frame decode)", e))?;

        let mut outcome = Ok(());
        let mut stopped_early = false;
        {
            let events = child.iter().map_err(|e| {
                command_failed_error(
                    "ffmpeg (frame decode)",
                    ExitStatus::default(),
                    e.to_string(),
                )
            })?;
            for event in events {
                match event {
                    FfmpegEvent::OutputFrame(raw) => {
                        let index = start + u64::from(raw.frame_num);
                        let Some(image) = RgbImage::from_raw(raw.width, raw.height, raw.data)
                        else {
                            warn!("Frame {index} has an unexpected buffer size, stopping");
                            stopped_early = true;
                            break;
                        };
                        match visit(Frame { index, image }) {
                            Ok(true) => {}
                            Ok(false) => {
                                stopped_early = true;
                                break;
                            }
                            Err(e) => {
                                outcome = Err(e);
                                stopped_early = true;
                                break;
                            }
                        }
                    }
                    FfmpegEvent::Error(message) => debug!("ffmpeg: {message}"),
                    _ => {}
                }
            }
        }

        if stopped_early {
            if let Err(e) = child.kill() {
                debug!("Failed to stop ffmpeg: {e}");
            }
        }
        if let Err(e) = child.wait() {
            debug!("Failed to reap ffmpeg: {e}");
        }
        outcome
    }
}

/// Reads frame count, frame rate and dimensions with `ffprobe`.
fn probe(path: &Path) -> CoreResult<VideoInfo> {
    debug!("Running ffprobe on {}", path.display());
    let metadata = ffprobe(path).map_err(|err| map_ffprobe_error(path, err))?;

    let stream = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| CoreError::Unreadable {
            path: path.to_path_buf(),
            reason: "no video stream".to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w as u32, h as u32),
        (w, h) => {
            return Err(CoreError::Unreadable {
                path: path.to_path_buf(),
                reason: format!("invalid dimensions {w:?}x{h:?}"),
            });
        }
    };

    let fps = match parse_rate(&stream.avg_frame_rate) {
        rate if rate > 0.0 => rate,
        _ => parse_rate(&stream.r_frame_rate),
    };

    let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse::<u64>().ok()) {
        Some(n) => n,
        None => {
            let duration = metadata
                .format
                .duration
                .as_deref()
                .and_then(|d| d.parse::<f64>().ok())
                .unwrap_or(0.0);
            let estimate = (duration * fps).round();
            warn!(
                "{} does not report a frame count, estimating {} from duration",
                path.display(),
                estimate
            );
            if estimate.is_finite() && estimate > 0.0 {
                estimate as u64
            } else {
                0
            }
        }
    };

    Ok(VideoInfo {
        frame_count,
        fps,
        width,
        height,
    })
}

/// Parses `30000/1001` or `25` style rates; unparsable or `0/0` gives 0.
fn parse_rate(rate: &str) -> f64 {
    let value = match rate.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(n), Ok(d)) if d != 0.0 => n / d,
            _ => 0.0,
        },
        None => rate.trim().parse::<f64>().unwrap_or(0.0),
    };
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn map_ffprobe_error(path: &Path, err: FfProbeError) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error("ffprobe", io_err),
        FfProbeError::Status(output) => CoreError::Unreadable {
            path: path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        },
        FfProbeError::Deserialize(err) => CoreError::VideoInfo(format!(
            "ffprobe output for {} could not be parsed: {err}",
            path.display()
        )),
        other => CoreError::VideoInfo(format!("ffprobe failed on {}: {other:?}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rational_rates() {
        assert!((parse_rate("30000/1001") - 29.97).abs() < 1e-2);
        assert_eq!(parse_rate("25/1"), 25.0);
        assert_eq!(parse_rate("24"), 24.0);
    }

    #[test]
    fn degenerate_rates_are_zero() {
        assert_eq!(parse_rate("0/0"), 0.0);
        assert_eq!(parse_rate(""), 0.0);
        assert_eq!(parse_rate("abc/2"), 0.0);
        assert_eq!(parse_rate("-5/1"), 0.0);
    }
}
