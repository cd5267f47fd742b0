//! Owned 8-bit frame buffer with an explicit row stride.

use ndarray::Array2;

use crate::error::{Result, TrackError};
use crate::frame::Point2D;

/// An immutable decoded image.
///
/// Pixels are stored row-major with `stride` bytes per row; each pixel holds
/// `channels` interleaved samples (1 = gray, 3 = RGB, 4 = RGBA). The buffer is
/// released when the frame is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap a raw interleaved buffer.
    pub fn from_raw(
        width: usize,
        height: usize,
        stride: usize,
        channels: usize,
        data: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TrackError::InvalidFrame(format!(
                "empty frame {}x{}",
                width, height
            )));
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(TrackError::InvalidFrame(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        if stride < width * channels {
            return Err(TrackError::InvalidFrame(format!(
                "stride {} shorter than row of {} bytes",
                stride,
                width * channels
            )));
        }
        let required = stride * (height - 1) + width * channels;
        if data.len() < required {
            return Err(TrackError::InvalidFrame(format!(
                "buffer holds {} bytes, need {}",
                data.len(),
                required
            )));
        }
        Ok(Self {
            width,
            height,
            stride,
            channels,
            data,
        })
    }

    /// Tightly packed grayscale frame.
    pub fn from_gray(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, width, 1, data)
    }

    /// Grayscale frame with every pixel set to `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Result<Self> {
        Self::from_gray(width, height, vec![value; width * height])
    }

    /// Grayscale frame generated from `f(row, col)`.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> u8,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                data.push(f(row, col));
            }
        }
        Self::from_gray(width, height, data)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// (width, height)
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn contains(&self, p: Point2D) -> bool {
        p.row >= 0 && p.col >= 0 && (p.row as usize) < self.height && (p.col as usize) < self.width
    }

    /// Raw samples of the pixel at (row, col).
    pub fn pixel(&self, row: usize, col: usize) -> Option<&[u8]> {
        if row >= self.height || col >= self.width {
            return None;
        }
        let start = row * self.stride + col * self.channels;
        self.data.get(start..start + self.channels)
    }

    /// Luminance in [0, 255]; BT.601 weights for color frames.
    pub fn intensity(&self, row: i32, col: i32) -> Option<f32> {
        if row < 0 || col < 0 {
            return None;
        }
        let px = self.pixel(row as usize, col as usize)?;
        Some(match px {
            [g] => *g as f32,
            [r, g, b, ..] => 0.299 * *r as f32 + 0.587 * *g as f32 + 0.114 * *b as f32,
            _ => return None,
        })
    }

    /// Luminance plane as a (height, width) array.
    pub fn to_gray(&self) -> Array2<f32> {
        Array2::from_shape_fn((self.height, self.width), |(r, c)| {
            self.intensity(r as i32, c as i32).unwrap_or(0.0)
        })
    }

    pub(crate) fn ensure_same_size(&self, other: &Frame) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(TrackError::FrameSizeMismatch {
                expected: self.dimensions(),
                actual: other.dimensions(),
            });
        }
        Ok(())
    }
}
