use crate::frame::Point2D;

/// External input delivered to a session at a frame boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Target-selection click on the displayed frame.
    Select(Point2D),
    /// Request for the next frame.
    Advance,
    Quit,
}
