use std::collections::VecDeque;
use std::sync::Arc;

use ndarray::{Array3, ArrayView3, s};

use crate::error::{Error, Result};
use crate::tracker::Rect;

/// A single video frame: HxWxC pixel data in row-major order.
///
/// Frames are shared as `Arc<Frame>` once they enter the pipeline and are
/// never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Frame {
    pixels: Array3<u8>,
    index: u64,
}

impl Frame {
    pub fn new(pixels: Array3<u8>, index: u64) -> Self {
        Self { pixels, index }
    }

    /// Wrap raw interleaved bytes.
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: u64,
    ) -> Result<Self> {
        let shape = (height as usize, width as usize, channels as usize);
        let pixels = Array3::from_shape_vec(shape, data).map_err(|e| {
            Error::InvalidConfig(format!(
                "frame data does not match {width}x{height}x{channels}: {e}"
            ))
        })?;
        Ok(Self { pixels, index })
    }

    /// An all-black frame, mostly useful in tests.
    pub fn blank(width: u32, height: u32, index: u64) -> Self {
        Self::new(Array3::zeros((height as usize, width as usize, 3)), index)
    }

    pub fn width(&self) -> u32 {
        self.pixels.dim().1 as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.dim().0 as u32
    }

    pub fn channels(&self) -> u8 {
        self.pixels.dim().2 as u8
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    /// Interleaved bytes in standard layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().copied().collect()
    }

    /// Copy the region around `rect` grown by `padding` on every side,
    /// clamped to the frame. `None` when the region misses the frame.
    pub fn crop(&self, rect: &Rect, padding: u32) -> Option<Frame> {
        let [x1, y1, x2, y2] = rect.to_tlbr();
        let pad = padding as f32;
        let w = self.width() as f32;
        let h = self.height() as f32;

        let cx1 = (x1 - pad).max(0.0).min(w) as usize;
        let cy1 = (y1 - pad).max(0.0).min(h) as usize;
        let cx2 = (x2 + pad).max(0.0).min(w) as usize;
        let cy2 = (y2 + pad).max(0.0).min(h) as usize;

        if cx2 <= cx1 || cy2 <= cy1 {
            return None;
        }

        let region = self.pixels.slice(s![cy1..cy2, cx1..cx2, ..]).to_owned();
        Some(Frame::new(region, self.index))
    }
}

/// Fixed-capacity window of the most recent frames.
///
/// Only the frame loop pushes; evidence jobs take a [`FrameRing::snapshot`],
/// which shares the frames but never the ring itself.
#[derive(Debug, Clone)]
pub struct FrameRing {
    frames: VecDeque<Arc<Frame>>,
    capacity: usize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Ring sized to hold `seconds` of video at `fps`.
    pub fn for_duration(fps: f32, seconds: f32) -> Self {
        Self::new((fps * seconds).max(0.0) as usize)
    }

    pub fn push(&mut self, frame: Arc<Frame>) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn snapshot(&self) -> Vec<Arc<Frame>> {
        self.frames.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
