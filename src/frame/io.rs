//! Frame decoding through the `image` crate.

use std::path::Path;

use crate::error::Result;
use crate::frame::{Frame, FrameSource};

/// Decode an image file into a frame, keeping color as packed RGB.
pub fn load_frame(path: impl AsRef<Path>) -> Result<Frame> {
    let decoded = image::open(path.as_ref())?;
    let frame = match decoded {
        image::DynamicImage::ImageLuma8(gray) => {
            let (w, h) = gray.dimensions();
            Frame::from_gray(w as usize, h as usize, gray.into_raw())?
        }
        other => {
            let rgb = other.to_rgb8();
            let (w, h) = rgb.dimensions();
            Frame::from_raw(w as usize, h as usize, w as usize * 3, 3, rgb.into_raw())?
        }
    };
    tracing::debug!(path = %path.as_ref().display(), width = frame.width(), height = frame.height(), "decoded frame");
    Ok(frame)
}

/// Frames decoded eagerly from an ordered list of files.
#[derive(Debug, Clone, Default)]
pub struct ImageSequence {
    frames: Vec<Frame>,
}

impl ImageSequence {
    /// Decode every path in order. Use [`crate::frame::ordered_frame_names`] to
    /// order a directory listing first.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let frames = paths
            .iter()
            .map(|p| load_frame(p))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(frames = frames.len(), "loaded image sequence");
        Ok(Self { frames })
    }
}

impl FrameSource for ImageSequence {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }
}
