//! [`TrackingBackend`] adapter for the constellation tracker.

use crate::backend::{BackendKind, BackendOutput, TrackingBackend};
use crate::error::{Result, TrackError};
use crate::frame::{Frame, Point2D};
use crate::tracker::constellation::ConstellationTracker;

impl TrackingBackend for ConstellationTracker {
    fn kind(&self) -> BackendKind {
        BackendKind::Constellation
    }

    fn activate(&mut self, frame: &Frame, selection: Option<Point2D>) -> Result<BackendOutput> {
        let click = selection.ok_or(TrackError::InvalidState(
            "constellation tracking needs a target selection",
        ))?;
        ConstellationTracker::activate(self, frame, click).map(BackendOutput::Constellation)
    }

    fn update(&mut self, prev: &Frame, curr: &Frame) -> Result<BackendOutput> {
        self.track(prev, curr).map(BackendOutput::Constellation)
    }

    fn is_active(&self) -> bool {
        self.is_tracking_activated()
    }

    fn deactivate(&mut self) {
        ConstellationTracker::deactivate(self)
    }
}
