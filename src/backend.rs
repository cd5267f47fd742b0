//! Capability interface shared by every tracking strategy.
//!
//! The session is written once against [`TrackingBackend`]; the constellation
//! tracker, the optical-flow wrapper and the sparse-feature registration
//! backend all implement it.

use crate::error::Result;
use crate::features::{DescriptorKind, Registration};
use crate::flow::{FlowMethod, MotionField};
use crate::frame::{Frame, Point2D};
use crate::tracker::{ConsistencyMetrics, ConstellationState};

/// Which strategy a backend implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Constellation,
    OpticalFlow(FlowMethod),
    SparseFeature(DescriptorKind),
}

impl BackendKind {
    /// Whether activation needs a target selection.
    pub fn needs_selection(&self) -> bool {
        matches!(self, BackendKind::Constellation)
    }
}

/// Result of one activation or update.
#[derive(Debug, Clone)]
pub enum BackendOutput {
    Constellation(ConstellationState),
    Motion(MotionField),
    Registration(Registration),
}

impl BackendOutput {
    /// Consistency metrics, reported only by the constellation tracker.
    pub fn metrics(&self) -> Option<&ConsistencyMetrics> {
        match self {
            BackendOutput::Constellation(state) => Some(&state.metrics),
            _ => None,
        }
    }

    pub fn as_constellation(&self) -> Option<&ConstellationState> {
        match self {
            BackendOutput::Constellation(state) => Some(state),
            _ => None,
        }
    }

    pub fn as_motion(&self) -> Option<&MotionField> {
        match self {
            BackendOutput::Motion(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_registration(&self) -> Option<&Registration> {
        match self {
            BackendOutput::Registration(registration) => Some(registration),
            _ => None,
        }
    }
}

/// Lifecycle every tracking strategy exposes: activate, update per frame
/// pair, report whether it is still active.
///
/// Frames are borrowed for the duration of a single call and must not be
/// retained.
pub trait TrackingBackend {
    fn kind(&self) -> BackendKind;

    /// Initialize on the first frame. `selection` is the user's target click,
    /// if one was made.
    fn activate(&mut self, frame: &Frame, selection: Option<Point2D>) -> Result<BackendOutput>;

    /// Advance from `prev` to `curr`.
    fn update(&mut self, prev: &Frame, curr: &Frame) -> Result<BackendOutput>;

    fn is_active(&self) -> bool;

    /// Drop all tracking state.
    fn deactivate(&mut self);
}

impl<B: TrackingBackend + ?Sized> TrackingBackend for Box<B> {
    fn kind(&self) -> BackendKind {
        (**self).kind()
    }

    fn activate(&mut self, frame: &Frame, selection: Option<Point2D>) -> Result<BackendOutput> {
        (**self).activate(frame, selection)
    }

    fn update(&mut self, prev: &Frame, curr: &Frame) -> Result<BackendOutput> {
        (**self).update(prev, curr)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn deactivate(&mut self) {
        (**self).deactivate()
    }
}
