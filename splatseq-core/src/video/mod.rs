// ============================================================================
// splatseq-core/src/video/mod.rs
// ============================================================================
//
// FRAME SOURCE: Opening Videos and Extracting RGB Frames
//
// Decoding sits behind two traits so the exporter can be driven by the
// ffmpeg-backed implementation in production and by an in-memory stream in
// tests.
//
// KEY COMPONENTS:
// - VideoBackend / FrameStream: decoder seam
// - VideoHandle: lifecycle wrapper (open, read, idempotent close)
// - SidecarVideoBackend: ffprobe metadata + ffmpeg-sidecar decoding
// - MemoryStream: pre-decoded frames for tests and embedding

mod memory;
mod sidecar;

pub use memory::{MemoryStats, MemoryStream};
pub use sidecar::{SidecarStream, SidecarVideoBackend};

use crate::error::{CoreError, CoreResult};
use crate::utils::format_duration;
use image::RgbImage;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Container metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub frame_count: u64,
    /// May be reported as 0 by a faulty container.
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// `frame_count / fps`, or 0 when fps is not positive.
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            0.0
        }
    }

    pub fn duration_formatted(&self) -> String {
        format_duration(self.duration())
    }
}

/// One decoded RGB frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// 0-based index within the video.
    pub index: u64,
    pub image: RgbImage,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// An open decoder over one video.
pub trait FrameStream {
    fn info(&self) -> &VideoInfo;

    /// Decodes the frame at `index`, or `None` when the decoder cannot
    /// produce it (past the real end, corrupt data).
    fn read_frame(&mut self, index: u64) -> CoreResult<Option<Frame>>;

    /// Streams frames `start..=end` to `visit` in order, stopping at the
    /// first index the decoder cannot produce or when `visit` returns
    /// `Ok(false)`. Errors from `visit` abort the read and are returned.
    fn read_frames(
        &mut self,
        start: u64,
        end: u64,
        visit: &mut dyn FnMut(Frame) -> CoreResult<bool>,
    ) -> CoreResult<()> {
        for index in start..=end {
            let Some(frame) = self.read_frame(index)? else {
                debug!("No frame at index {index}, stopping range read");
                break;
            };
            if !visit(frame)? {
                break;
            }
        }
        Ok(())
    }

    /// Frees decoder resources. Called at most once.
    fn release(&mut self) {}
}

/// Something that can open videos.
pub trait VideoBackend {
    type Stream: FrameStream;

    /// Opens `path`, which is known to exist.
    fn open(&self, path: &Path) -> CoreResult<Self::Stream>;
}

/// An open video, exclusively owned by its opener.
///
/// Reads after [`close`](Self::close) fail with `HandleClosed`. Closing twice
/// is a no-op, and dropping an open handle closes it.
pub struct VideoHandle<S: FrameStream> {
    path: PathBuf,
    stream: Option<S>,
}

impl<S: FrameStream> VideoHandle<S> {
    /// Opens `path` with `backend`. Fails with `NotFound` for missing paths
    /// and `Unreadable` when the container cannot be opened.
    pub fn open<B>(backend: &B, path: &Path) -> CoreResult<Self>
    where
        B: VideoBackend<Stream = S>,
    {
        if !path.exists() {
            return Err(CoreError::NotFound(path.to_path_buf()));
        }
        let stream = backend.open(path)?;
        let info = stream.info();
        debug!(
            "Opened {} ({}x{}, {} frames at {:.3} fps)",
            path.display(),
            info.width,
            info.height,
            info.frame_count,
            info.fps
        );
        Ok(Self::from_stream(path, stream))
    }

    /// Wraps an already-open stream.
    pub fn from_stream(path: impl Into<PathBuf>, stream: S) -> Self {
        Self {
            path: path.into(),
            stream: Some(stream),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream(&mut self) -> CoreResult<&mut S> {
        self.stream
            .as_mut()
            .ok_or_else(|| CoreError::HandleClosed(self.path.clone()))
    }

    pub fn info(&self) -> CoreResult<VideoInfo> {
        self.stream
            .as_ref()
            .map(|s| *s.info())
            .ok_or_else(|| CoreError::HandleClosed(self.path.clone()))
    }

    /// Decodes one frame; `None` when it cannot be produced.
    pub fn extract_frame(&mut self, index: u64) -> CoreResult<Option<Frame>> {
        self.stream()?.read_frame(index)
    }

    /// Streams `start..=end`. A short read ends the stream early without
    /// an error.
    pub fn for_each_frame<F>(&mut self, start: u64, end: u64, mut visit: F) -> CoreResult<()>
    where
        F: FnMut(Frame) -> CoreResult<bool>,
    {
        if start > end {
            return Err(CoreError::InvalidRange(format!(
                "start ({start}) is after end ({end})"
            )));
        }
        let mut next = start;
        self.stream()?.read_frames(start, end, &mut |frame: Frame| {
            if frame.index != next {
                warn!(
                    "Decoder returned frame {} where {} was expected, stopping",
                    frame.index, next
                );
                return Ok(false);
            }
            next += 1;
            visit(frame)
        })
    }

    /// Decodes `start..=end` into memory, truncated at the first missing frame.
    pub fn extract_frames_range(&mut self, start: u64, end: u64) -> CoreResult<Vec<Frame>> {
        let mut frames = Vec::new();
        self.for_each_frame(start, end, |frame| {
            frames.push(frame);
            Ok(true)
        })?;
        if (frames.len() as u64) < end - start + 1 {
            debug!(
                "Range {start}..={end} of {} truncated to {} frames",
                self.path.display(),
                frames.len()
            );
        }
        Ok(frames)
    }

    /// Releases the decoder. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.release();
            debug!("Closed {}", self.path.display());
        }
    }
}

impl<S: FrameStream> Drop for VideoHandle<S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Writes a frame as an image file; the format follows the extension.
pub fn save_frame(frame: &Frame, path: &Path) -> CoreResult<()> {
    frame.image.save(path).map_err(|e| match e {
        image::ImageError::IoError(io) => crate::error::write_error(path, io),
        other => CoreError::OperationFailed(format!(
            "failed to encode frame {} to {}: {other}",
            frame.index,
            path.display()
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn stream(frames: usize, reported: u64) -> MemoryStream {
        let images = (0..frames)
            .map(|i| RgbImage::from_pixel(4, 2, Rgb([i as u8, 0, 0])))
            .collect();
        MemoryStream::new(images, 25.0).with_reported_frame_count(reported)
    }

    #[test]
    fn zero_fps_reports_zero_duration() {
        let info = VideoInfo {
            frame_count: 120,
            fps: 0.0,
            width: 640,
            height: 480,
        };
        assert_eq!(info.duration(), 0.0);
        assert_eq!(info.duration_formatted(), "0.0s");
    }

    #[test]
    fn duration_is_frames_over_fps() {
        let info = VideoInfo {
            frame_count: 7500,
            fps: 25.0,
            width: 1,
            height: 1,
        };
        assert_eq!(info.duration(), 300.0);
        assert_eq!(info.duration_formatted(), "5m 0.0s");
    }

    #[test]
    fn open_missing_path_is_not_found() {
        let missing = Path::new("/definitely/not/here.mp4");
        let result = VideoHandle::open(&SidecarVideoBackend, missing);
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn range_is_a_prefix_when_the_tail_is_missing() {
        // Container claims 10 frames, only 6 decode.
        let mut handle = VideoHandle::from_stream("clip.mp4", stream(6, 10));
        let frames = handle.extract_frames_range(3, 9).unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![3, 4, 5]);
        assert_eq!(frames[0].image.get_pixel(0, 0)[0], 3);
    }

    #[test]
    fn range_never_leaves_the_requested_bounds() {
        let mut handle = VideoHandle::from_stream("clip.mp4", stream(10, 10));
        for (start, end) in [(0, 0), (2, 5), (9, 9), (0, 9)] {
            let frames = handle.extract_frames_range(start, end).unwrap();
            let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
            assert_eq!(indices, (start..=end).collect::<Vec<_>>());
        }
    }

    #[test]
    fn extract_frame_past_end_is_none() {
        let mut handle = VideoHandle::from_stream("clip.mp4", stream(3, 3));
        assert!(handle.extract_frame(2).unwrap().is_some());
        assert!(handle.extract_frame(3).unwrap().is_none());
    }

    #[test]
    fn reversed_range_is_rejected() {
        let mut handle = VideoHandle::from_stream("clip.mp4", stream(10, 10));
        assert!(matches!(
            handle.extract_frames_range(5, 2),
            Err(CoreError::InvalidRange(_))
        ));
    }

    #[test]
    fn closed_handle_rejects_reads_and_close_is_idempotent() {
        let source = stream(3, 3);
        let stats = source.stats();
        let mut handle = VideoHandle::from_stream("clip.mp4", source);
        handle.close();
        handle.close();
        assert!(handle.is_closed());
        assert_eq!(stats.releases(), 1);
        assert!(matches!(
            handle.extract_frame(0),
            Err(CoreError::HandleClosed(_))
        ));
        assert!(matches!(handle.info(), Err(CoreError::HandleClosed(_))));
    }

    #[test]
    fn drop_releases_the_stream() {
        let source = stream(1, 1);
        let stats = source.stats();
        drop(VideoHandle::from_stream("clip.mp4", source));
        assert_eq!(stats.releases(), 1);
    }

    #[test]
    fn save_frame_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let frame = Frame {
            index: 0,
            image: RgbImage::from_pixel(3, 3, Rgb([1, 2, 3])),
        };
        save_frame(&frame, &path).unwrap();
        let back = image::open(&path).unwrap().to_rgb8();
        assert_eq!(back, frame.image);
    }
}
