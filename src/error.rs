//! Error taxonomy shared by every tracking backend and the session.

use crate::frame::Point2D;

/// Errors produced while initializing or running a tracker.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The selected point (expanded by the peripheral offsets) does not fit in the frame.
    #[error("cannot initialize tracking at {point}: {reason}")]
    Initialization { point: Point2D, reason: String },

    /// A tracked point would have left the frame.
    #[error("tracked point {point_index} moved outside the frame to {position}")]
    BoundaryViolation { point_index: usize, position: Point2D },

    /// Every trackable point fell below the minimum match confidence.
    #[error("track lost (best confidence {best_confidence:.3})")]
    TrackLoss { best_confidence: f32 },

    #[error("insufficient correspondences: found {found}, need at least {required}")]
    InsufficientCorrespondences { found: usize, required: usize },

    #[error("flow computation failed: {0}")]
    FlowComputation(String),

    /// The requested frame index is past the end of the sequence.
    #[error("frame source exhausted at index {index} (length {len})")]
    FrameSourceExhausted { index: usize, len: usize },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("frame size mismatch: {expected:?} vs {actual:?}")]
    FrameSizeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Lifecycle misuse, such as updating a backend that was never activated.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[cfg(feature = "image-io")]
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

impl TrackError {
    /// Whether the session may keep the current target after this error.
    ///
    /// Initialization failures ask for a new selection; numerical backend
    /// failures may clear up on the next frame pair.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Initialization { .. }
                | Self::InsufficientCorrespondences { .. }
                | Self::FlowComputation(_)
        )
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackError>;
