//! Frames, pixel coordinates and the frame sequence the session walks.

mod buffer;
mod point;
mod source;

#[cfg(feature = "image-io")]
mod io;

pub use buffer::Frame;
pub use point::Point2D;
pub use source::{FrameSource, InMemoryFrames, ordered_frame_names};

#[cfg(feature = "image-io")]
pub use io::{ImageSequence, load_frame};
