//! Ordered, indexable frame sequences.

use crate::frame::Frame;

/// Ordered sequence of decoded frames.
///
/// The source keeps ownership of every frame; consumers only borrow them.
pub trait FrameSource {
    /// Number of frames in the sequence.
    fn len(&self) -> usize;

    /// Frame at `index`, or `None` past the end.
    fn frame(&self, index: usize) -> Option<&Frame>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Vec-backed frame source.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFrames {
    frames: Vec<Frame>,
}

impl InMemoryFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn into_inner(self) -> Vec<Frame> {
        self.frames
    }
}

impl From<Vec<Frame>> for InMemoryFrames {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

impl FrameSource for InMemoryFrames {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }
}

/// Order a directory listing the way frame sequences are consumed.
///
/// Names are sorted in descending lexicographic order and then read from the
/// back, which yields ascending order. Any name containing `extension` is
/// kept, wherever in the name it occurs.
pub fn ordered_frame_names<S: AsRef<str>>(names: &[S], extension: &str) -> Vec<String> {
    let mut sorted: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    sorted
        .into_iter()
        .rev()
        .filter(|name| name.contains(extension))
        .map(str::to_owned)
        .collect()
}
