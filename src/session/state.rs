use std::fmt;

use crate::session::config::Metric;

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    /// The backend lost every trackable point.
    TrackLost,
    /// A tracked point left the frame.
    BoundaryViolation,
    ThresholdExceeded(Metric),
    /// The frame index ran past the end of the sequence.
    Exhausted,
    Quit,
    /// Unrecoverable backend error, or recoverable errors beyond the retry budget.
    BackendFailure,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TrackLost => write!(f, "track lost"),
            StopReason::BoundaryViolation => write!(f, "boundary violation"),
            StopReason::ThresholdExceeded(metric) => write!(f, "{:?} threshold exceeded", metric),
            StopReason::Exhausted => write!(f, "frame source exhausted"),
            StopReason::Quit => write!(f, "quit"),
            StopReason::BackendFailure => write!(f, "backend failure"),
        }
    }
}

/// Session lifecycle: `AwaitingSelection -> Tracking -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingSelection,
    Tracking,
    /// Terminal.
    Stopped(StopReason),
}

impl SessionState {
    #[inline]
    pub fn is_tracking(&self) -> bool {
        matches!(self, SessionState::Tracking)
    }

    #[inline]
    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped(_))
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            SessionState::Stopped(reason) => Some(*reason),
            _ => None,
        }
    }
}
