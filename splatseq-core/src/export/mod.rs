// ============================================================================
// splatseq-core/src/export/mod.rs
// ============================================================================
//
// SEQUENCE EXPORTER: Video Frame Range -> One PLY File per Frame
//
// Drives the projection pipeline over a contiguous frame range. Each frame is
// isolated: a failed prediction, write or conversion is recorded in the
// report and the run moves on to the next frame. Only problems with the run
// itself (bad range, bad focal length, unusable output directory) abort.
//
// KEY COMPONENTS:
// - SequenceExporter: the run loop
// - ExportOptions: output schema and encoding
// - ExportReport / FrameFailure: accounting handed back to the caller
// - CancellationToken: cooperative stop between frames

mod report;

pub use report::{CancellationToken, ExportReport, FrameFailure};

use crate::error::{CoreError, CoreResult, write_error};
use crate::ply::{PlyEncoding, downconvert, write_extended};
use crate::predictor::GaussianPredictor;
use crate::processing::project_frame;
use crate::reporting::{FrameOutcome, Reporter, SessionStart, SessionSummary};
use crate::utils::{extended_frame_filename, get_timestamp, standard_frame_filename};
use crate::video::{Frame, FrameStream, VideoHandle};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Output settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Replace each extended file with its vertex-only form.
    pub downconvert: bool,
    pub encoding: PlyEncoding,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            downconvert: true,
            encoding: PlyEncoding::BinaryLittleEndian,
        }
    }
}

/// Per-run session directory: `<out_dir>/<video stem>/<timestamp>`.
pub fn session_directory(out_dir: &Path, video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    out_dir.join(stem).join(get_timestamp())
}

/// Exports frame ranges of one video with one predictor.
pub struct SequenceExporter<'a, P: GaussianPredictor + ?Sized> {
    predictor: &'a P,
    options: ExportOptions,
    reporter: &'a dyn Reporter,
    cancellation: CancellationToken,
}

impl<'a, P: GaussianPredictor + ?Sized> SequenceExporter<'a, P> {
    pub fn new(predictor: &'a P, options: ExportOptions, reporter: &'a dyn Reporter) -> Self {
        Self {
            predictor,
            options,
            reporter,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Exports frames `start..=end` into a fresh session directory under
    /// `out_dir`.
    ///
    /// Range and focal length are checked before any frame is read. A read
    /// that ends early is not an error; the report covers the frames that
    /// were actually decoded.
    pub fn run<S: FrameStream>(
        &self,
        handle: &mut VideoHandle<S>,
        start: u64,
        end: u64,
        focal_length_px: f64,
        out_dir: &Path,
    ) -> CoreResult<ExportReport> {
        if start > end {
            return Err(CoreError::InvalidRange(format!(
                "start ({start}) is after end ({end})"
            )));
        }
        let info = handle.info()?;
        if info.frame_count > 0 && end >= info.frame_count {
            return Err(CoreError::InvalidRange(format!(
                "end ({end}) is beyond the last frame ({})",
                info.frame_count - 1
            )));
        }
        if !focal_length_px.is_finite() || focal_length_px <= 0.0 {
            return Err(CoreError::InvalidFocalLength(focal_length_px));
        }

        let session_dir = session_directory(out_dir, handle.path());
        fs::create_dir_all(&session_dir).map_err(|e| write_error(&session_dir, e))?;
        info!(
            "Exporting frames {start}..={end} of {} to {}",
            handle.path().display(),
            session_dir.display()
        );
        self.reporter.session_started(&SessionStart {
            session_dir: session_dir.display().to_string(),
            start,
            end,
            processing_resolution: self.predictor.processing_resolution(),
            predictor: self.predictor.name().to_string(),
            downconvert: self.options.downconvert,
        });

        let started = Instant::now();
        let total = end - start + 1;
        let mut report = ExportReport::new(session_dir.clone());

        handle.for_each_frame(start, end, |frame| {
            if self.cancellation.is_cancelled() {
                info!("Export cancelled before frame {}", frame.index);
                report.cancelled = true;
                return Ok(false);
            }
            report.attempted += 1;

            let outcome = match self.export_frame(&frame, focal_length_px, &session_dir) {
                Ok((path, bytes)) => {
                    debug!("Frame {} -> {} ({bytes} bytes)", frame.index, path.display());
                    report.succeeded += 1;
                    report.bytes_written += bytes;
                    report.written.push(path);
                    FrameOutcome {
                        index: frame.index,
                        position: frame.index - start + 1,
                        total,
                        success: true,
                        message: "exported".to_string(),
                    }
                }
                Err(error) => {
                    warn!("Frame {} failed: {error}", frame.index);
                    let message = error.to_string();
                    report.failures.push(FrameFailure {
                        index: frame.index,
                        error,
                    });
                    FrameOutcome {
                        index: frame.index,
                        position: frame.index - start + 1,
                        total,
                        success: false,
                        message,
                    }
                }
            };
            self.reporter.frame_complete(&outcome);
            Ok(true)
        })?;

        if report.attempted == 0 && !report.cancelled {
            if let Err(e) = fs::remove_dir(&session_dir) {
                debug!("Could not remove empty {}: {e}", session_dir.display());
            }
            return Err(CoreError::InvalidRange(format!(
                "no frames extracted from {} in {start}..={end}",
                handle.path().display()
            )));
        }

        info!(
            "Export finished: {} of {} frames succeeded",
            report.succeeded, report.attempted
        );
        self.reporter.session_complete(&SessionSummary {
            session_dir: session_dir.display().to_string(),
            attempted: report.attempted,
            succeeded: report.succeeded,
            failures: report
                .failures
                .iter()
                .map(|f| (f.index, f.error.to_string()))
                .collect(),
            bytes_written: report.bytes_written,
            elapsed: started.elapsed(),
            cancelled: report.cancelled,
        });
        Ok(report)
    }

    /// Projects and writes one frame. Returns the final file and its size.
    fn export_frame(
        &self,
        frame: &Frame,
        focal_length_px: f64,
        session_dir: &Path,
    ) -> CoreResult<(PathBuf, u64)> {
        let projected = project_frame(&frame.image, focal_length_px, self.predictor)?;
        let extended = session_dir.join(extended_frame_filename(frame.index));
        let bytes = write_extended(
            &projected.gaussians,
            &projected.intrinsics,
            self.options.encoding,
            &extended,
        )?;
        if !self.options.downconvert {
            return Ok((extended, bytes));
        }

        let standard = session_dir.join(standard_frame_filename(frame.index));
        let summary = downconvert(&extended, &standard, self.options.encoding)?;
        discard_intermediate(&extended);
        Ok((standard, summary.bytes_written))
    }
}

/// Best-effort removal of an extended file once its standard copy exists.
///
/// Failures are logged and never fail the frame. Returns whether the file
/// was removed.
fn discard_intermediate(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not delete {} after conversion: {e}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorSpace;
    use crate::gaussians::{Gaussian, GaussianSetNdc};
    use crate::ply::PlyFile;
    use crate::processing::ImageTensor;
    use crate::reporting::NullReporter;
    use crate::video::MemoryStream;
    use image::{Rgb, RgbImage};
    use nalgebra::{UnitQuaternion, Vector3};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Four Gaussians per frame; fails on frames whose first pixel encodes
    /// one of `fail_on`.
    struct FixedPredictor {
        fail_on: Vec<u8>,
    }

    impl GaussianPredictor for FixedPredictor {
        fn processing_resolution(&self) -> u32 {
            8
        }

        fn predict(&self, image: &ImageTensor, _: f64) -> CoreResult<GaussianSetNdc> {
            let tag = (image.get(0, 0, 0) * 255.0).round() as u8;
            if self.fail_on.contains(&tag) {
                return Err(CoreError::PredictionFailure("out of memory".into()));
            }
            let gaussians = (0..4)
                .map(|i| Gaussian {
                    mean: Vector3::new(0.1 * i as f32, 0.0, 1.0 + i as f32),
                    color: Vector3::new(0.5, 0.5, 0.5),
                    opacity: 0.9,
                    scale: Vector3::new(0.01, 0.01, 0.01),
                    rotation: UnitQuaternion::identity(),
                })
                .collect();
            Ok(GaussianSetNdc::new(gaussians, ColorSpace::LinearRgb))
        }
    }

    fn video(frames: u8) -> VideoHandle<MemoryStream> {
        let images = (0..frames)
            .map(|i| RgbImage::from_pixel(16, 12, Rgb([i, 0, 0])))
            .collect();
        VideoHandle::from_stream("clip.mp4", MemoryStream::new(images, 30.0))
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(u64, bool)>>);

    impl Reporter for Recorder {
        fn frame_complete(&self, outcome: &FrameOutcome) {
            self.0.lock().unwrap().push((outcome.index, outcome.success));
        }
    }

    #[test]
    fn one_failing_frame_does_not_abort_the_run() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![3] };
        let recorder = Recorder::default();
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &recorder);
        let mut handle = video(5);

        let report = exporter.run(&mut handle, 0, 4, 20.0, dir.path()).unwrap();

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed_indices(), vec![3]);
        assert!(matches!(
            report.failures[0].error,
            CoreError::PredictionFailure(_)
        ));
        for index in [0, 1, 2, 4] {
            let path = report.session_dir.join(standard_frame_filename(index));
            assert!(path.exists(), "{}", path.display());
            assert!(!report.session_dir.join(extended_frame_filename(index)).exists());
        }
        assert!(!report.session_dir.join(standard_frame_filename(3)).exists());
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![(0, true), (1, true), (2, true), (3, false), (4, true)]
        );
    }

    #[test]
    fn session_directory_is_nested_under_the_video_stem() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        let report = exporter
            .run(&mut video(2), 0, 1, 20.0, dir.path())
            .unwrap();
        assert_eq!(report.session_dir.parent().unwrap(), dir.path().join("clip"));
        assert_eq!(report.written.len(), 2);
    }

    #[test]
    fn reversed_range_fails_before_any_frame_is_read() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        let source = MemoryStream::new(vec![RgbImage::new(4, 4); 8], 30.0);
        let stats = source.stats();
        let mut handle = VideoHandle::from_stream("clip.mp4", source);

        let err = exporter.run(&mut handle, 5, 2, 20.0, dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange(_)));
        assert_eq!(stats.reads(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn end_past_the_frame_count_is_rejected() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        let err = exporter
            .run(&mut video(5), 0, 5, 20.0, dir.path())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidRange(_)));
    }

    #[test]
    fn invalid_focal_length_is_rejected() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        for focal in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                exporter.run(&mut video(2), 0, 1, focal, dir.path()),
                Err(CoreError::InvalidFocalLength(_))
            ));
        }
    }

    #[test]
    fn truncated_video_exports_the_decoded_prefix() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        let images = vec![RgbImage::new(4, 4); 3];
        let mut handle = VideoHandle::from_stream(
            "clip.mp4",
            MemoryStream::new(images, 30.0).with_reported_frame_count(10),
        );
        let report = exporter.run(&mut handle, 1, 8, 20.0, dir.path()).unwrap();
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
    }

    #[test]
    fn empty_extraction_is_an_error() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter);
        let mut handle = VideoHandle::from_stream(
            "clip.mp4",
            MemoryStream::new(vec![RgbImage::new(4, 4)], 30.0).with_reported_frame_count(10),
        );
        assert!(matches!(
            exporter.run(&mut handle, 4, 6, 20.0, dir.path()),
            Err(CoreError::InvalidRange(_))
        ));
    }

    #[test]
    fn keeping_extended_files_writes_auxiliary_elements() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let options = ExportOptions {
            downconvert: false,
            encoding: PlyEncoding::Ascii,
        };
        let exporter = SequenceExporter::new(&predictor, options, &NullReporter);
        let report = exporter.run(&mut video(1), 0, 0, 20.0, dir.path()).unwrap();
        let file = PlyFile::read(&report.written[0]).unwrap();
        assert_eq!(file.encoding, PlyEncoding::Ascii);
        assert_eq!(file.vertex().unwrap().count(), 4);
        assert!(file.element("intrinsic").is_some());
    }

    #[test]
    fn discarding_intermediate_removes_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame_000000.ply");
        fs::write(&path, b"ply").unwrap();
        assert!(discard_intermediate(&path));
        assert!(!path.exists());
    }

    #[test]
    fn failed_discard_is_swallowed() {
        let dir = tempdir().unwrap();
        // A directory cannot be removed with remove_file.
        let stuck = dir.path().join("frame_000000.ply");
        fs::create_dir(&stuck).unwrap();
        fs::write(stuck.join("keep"), b"x").unwrap();

        assert!(!discard_intermediate(&stuck));
        assert!(stuck.join("keep").exists());
    }

    #[test]
    fn cancellation_stops_between_frames() {
        let dir = tempdir().unwrap();
        let predictor = FixedPredictor { fail_on: vec![] };
        let token = CancellationToken::new();
        token.cancel();
        let exporter = SequenceExporter::new(&predictor, ExportOptions::default(), &NullReporter)
            .with_cancellation(token);
        let report = exporter.run(&mut video(3), 0, 2, 20.0, dir.path()).unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempted, 0);
    }
}
