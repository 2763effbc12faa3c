//! Pre-decoded frames held in memory.

use super::{Frame, FrameStream, VideoInfo};
use crate::error::CoreResult;
use image::RgbImage;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read and release counters shared with the caller.
#[derive(Debug, Default)]
pub struct MemoryStats {
    reads: AtomicUsize,
    releases: AtomicUsize,
}

impl MemoryStats {
    /// Number of frames decoded so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// A [`FrameStream`] over frames that are already decoded.
///
/// The reported frame count can be set higher than the number of frames
/// held, which mimics a container whose tail cannot be decoded.
#[derive(Debug)]
pub struct MemoryStream {
    frames: Vec<RgbImage>,
    info: VideoInfo,
    stats: Arc<MemoryStats>,
}

impl MemoryStream {
    /// All frames must share the dimensions of the first one.
    pub fn new(frames: Vec<RgbImage>, fps: f64) -> Self {
        let (width, height) = frames.first().map_or((0, 0), |f| f.dimensions());
        let info = VideoInfo {
            frame_count: frames.len() as u64,
            fps,
            width,
            height,
        };
        Self {
            frames,
            info,
            stats: Arc::default(),
        }
    }

    pub fn with_reported_frame_count(mut self, frame_count: u64) -> Self {
        self.info.frame_count = frame_count;
        self
    }

    pub fn stats(&self) -> Arc<MemoryStats> {
        Arc::clone(&self.stats)
    }
}

impl FrameStream for MemoryStream {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn read_frame(&mut self, index: u64) -> CoreResult<Option<Frame>> {
        let Some(image) = usize::try_from(index).ok().and_then(|i| self.frames.get(i)) else {
            return Ok(None);
        };
        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Frame {
            index,
            image: image.clone(),
        }))
    }

    fn release(&mut self) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
    }
}
